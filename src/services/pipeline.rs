//! Sequential batch translation of the rows a memory is still missing.

use std::collections::HashSet;
use std::{thread, time::Duration};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::CoreResult;
use crate::model::entry::{Origin, PendingEntry};
use crate::model::settings::TranslatorSettings;
use crate::parsers::script::has_japanese;
use crate::services::provider::{parse_reply, BatchRequest, ProviderError, TranslationProvider};
use crate::services::report::{BatchItemResult, BatchReport, RunReport};
use crate::services::translation_memory::matcher::reconcile_batch;
use crate::services::translation_memory::normalize::clean_translation;
use crate::services::translation_memory::TranslationMemory;

pub struct Orchestrator<'a> {
    provider: &'a dyn TranslationProvider,
    settings: &'a TranslatorSettings,
    sleep: &'a dyn Fn(Duration),
}

/// Sources still lacking a translation, first row wins, in sheet order.
pub fn pending_entries(memory: &TranslationMemory, require_japanese: bool) -> Vec<PendingEntry> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (index, row) in memory.rows().iter().enumerate() {
        let source = row.source_text();
        if source.is_empty() || row.is_translated() || row.is_locator_header() {
            continue;
        }
        if require_japanese && !has_japanese(source) {
            continue;
        }
        if memory.lookup_exact(source).is_some() || !seen.insert(source.to_string()) {
            continue;
        }
        out.push(PendingEntry::new(
            source,
            row.notes.trim(),
            Origin::MemoryRow { index },
        ));
    }

    out
}

/// Fills empty rows whose source already has a translation in another row.
fn propagate_known(memory: &mut TranslationMemory) -> usize {
    let known: Vec<(String, String)> = memory
        .rows()
        .iter()
        .filter(|r| !r.is_translated())
        .filter_map(|r| {
            let source = r.source_text();
            memory
                .lookup_exact(source)
                .map(|t| (source.to_string(), t.to_string()))
        })
        .collect();

    known
        .into_iter()
        .map(|(source, target)| memory.fill_missing(&source, &target))
        .sum()
}

fn backoff(attempt: usize, base_delay_ms: u64) -> Duration {
    Duration::from_millis(attempt as u64 * base_delay_ms)
}

fn failed_item(entry: &PendingEntry, error: &str) -> BatchItemResult {
    BatchItemResult {
        entry_id: entry.entry_id.clone(),
        source_text: entry.source_text.clone(),
        ok: false,
        translation: None,
        matched_key: None,
        error: Some(error.to_string()),
    }
}

impl<'a> Orchestrator<'a> {
    pub fn new(provider: &'a dyn TranslationProvider, settings: &'a TranslatorSettings) -> Self {
        Self {
            provider,
            settings,
            sleep: &thread::sleep,
        }
    }

    /// Calls the provider until it returns a usable object or the attempts
    /// run out. Returns the reply and how many attempts were made.
    fn request_with_retry(
        &self,
        request: &BatchRequest,
    ) -> (Result<Map<String, Value>, ProviderError>, usize) {
        let max_attempts = self.settings.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let result = self
                .provider
                .translate_batch(request)
                .and_then(|content| parse_reply(&content));

            match result {
                Ok(map) => return (Ok(map), attempt),
                Err(e) if attempt < max_attempts => {
                    let delay = backoff(attempt, self.settings.base_delay_ms);
                    let delay_ms = delay.as_millis() as u64;
                    warn!(attempt, delay_ms, "batch attempt failed: {e}");
                    (self.sleep)(delay);
                    attempt += 1;
                }
                Err(e) => return (Err(e), attempt),
            }
        }
    }

    /// Translates every pending row of `memory`, one batch at a time.
    ///
    /// `checkpoint` runs after each batch whether it succeeded or not, so an
    /// interrupted run keeps every translation made so far. A batch that
    /// exhausts its attempts leaves its rows empty and the run moves on.
    pub fn run(
        &self,
        memory: &mut TranslationMemory,
        mut checkpoint: impl FnMut(&TranslationMemory) -> CoreResult<()>,
    ) -> CoreResult<RunReport> {
        let mut report = RunReport {
            propagated: propagate_known(memory),
            ..RunReport::default()
        };

        let pending = pending_entries(memory, self.settings.require_japanese);
        let batch_size = self.settings.batch_size.max(1);
        let instruction = self.settings.system_instruction();

        info!(
            pending = pending.len(),
            batch_size,
            propagated = report.propagated,
            "starting translation run"
        );

        for (index, chunk) in pending.chunks(batch_size).enumerate() {
            let request = BatchRequest {
                sources: chunk.iter().map(|e| e.source_text.clone()).collect(),
                instruction: instruction.clone(),
            };
            report.batches_total += 1;

            let (result, attempts) = self.request_with_retry(&request);

            match result {
                Ok(reply) => {
                    let (resolved, unresolved) = reconcile_batch(
                        chunk.to_vec(),
                        &reply,
                        self.settings.fuzzy_tolerance_ratio,
                    );

                    for r in resolved {
                        let cleaned = clean_translation(&r.translation);
                        if cleaned.is_empty() {
                            report.unresolved += 1;
                            report.items.push(failed_item(&r.entry, "empty after cleanup"));
                            continue;
                        }
                        memory.fill_missing(r.source_text(), &cleaned);
                        report.resolved += 1;
                        report.items.push(BatchItemResult {
                            entry_id: r.entry.entry_id.clone(),
                            source_text: r.entry.source_text.clone(),
                            ok: true,
                            translation: Some(cleaned),
                            matched_key: r.matched_key,
                            error: None,
                        });
                    }

                    for entry in &unresolved {
                        report.unresolved += 1;
                        report.items.push(failed_item(entry, "missing from response"));
                    }

                    info!(
                        batch = index,
                        attempts,
                        unresolved = unresolved.len(),
                        "batch translated"
                    );
                    report.batches.push(BatchReport {
                        index,
                        size: chunk.len(),
                        attempts,
                        ok: true,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(batch = index, attempts, "batch failed: {e}");
                    let message = e.to_string();
                    report.batches_failed += 1;
                    report.unresolved += chunk.len();
                    report
                        .items
                        .extend(chunk.iter().map(|entry| failed_item(entry, &message)));
                    report.batches.push(BatchReport {
                        index,
                        size: chunk.len(),
                        attempts,
                        ok: false,
                        error: Some(message),
                    });
                }
            }

            checkpoint(memory)?;
        }

        info!(
            batches = report.batches_total,
            failed = report.batches_failed,
            resolved = report.resolved,
            unresolved = report.unresolved,
            "translation run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::translation_memory::{MemoryRow, StoreFlavor};
    use std::cell::RefCell;

    /// Answers each request through `reply`, recording what was asked.
    struct ScriptedProvider<F> {
        reply: F,
        requests: RefCell<Vec<Vec<String>>>,
    }

    impl<F> ScriptedProvider<F>
    where
        F: Fn(&BatchRequest, usize) -> Result<String, ProviderError>,
    {
        fn new(reply: F) -> Self {
            Self {
                reply,
                requests: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl<F> TranslationProvider for ScriptedProvider<F>
    where
        F: Fn(&BatchRequest, usize) -> Result<String, ProviderError>,
    {
        fn translate_batch(&self, request: &BatchRequest) -> Result<String, ProviderError> {
            let call = self.calls();
            self.requests.borrow_mut().push(request.sources.clone());
            (self.reply)(request, call)
        }
    }

    fn settings(batch_size: usize) -> TranslatorSettings {
        TranslatorSettings {
            batch_size,
            base_delay_ms: 0,
            ..TranslatorSettings::default()
        }
    }

    fn memory(rows: &[(&str, &str)]) -> TranslationMemory {
        TranslationMemory::from_rows(
            StoreFlavor::Extern,
            rows.iter().map(|(s, t)| MemoryRow::new(s, t, "")).collect(),
        )
    }

    fn echo(translations: &[(&str, &str)]) -> String {
        let map: Map<String, Value> = translations
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        Value::Object(map).to_string()
    }

    #[test]
    fn failed_batch_does_not_stop_later_batches() {
        let mut tm = memory(&[("壊れた", ""), ("はい", "")]);
        let provider = ScriptedProvider::new(|request: &BatchRequest, _| {
            if request.sources[0] == "壊れた" {
                Err(ProviderError::Http("HTTP 500: boom".into()))
            } else {
                Ok(echo(&[("はい", "Yes")]))
            }
        });
        let settings = settings(1);
        let mut checkpoints = 0;

        let report = Orchestrator::new(&provider, &settings)
            .run(&mut tm, |_| {
                checkpoints += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(provider.calls(), settings.max_retries + 1);
        assert_eq!(checkpoints, 2);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.unresolved, 1);
        assert_eq!(report.resolved, 1);
        assert_eq!(tm.lookup_exact("壊れた"), None);
        assert_eq!(tm.lookup_exact("はい"), Some("Yes"));
    }

    #[test]
    fn translated_rows_are_never_requested_or_overwritten() {
        let mut tm = memory(&[
            ("はい", "Yes"),
            ("いいえ", ""),
            ("はい", ""),
            ("3:Guard:0", ""),
            ("Options", ""),
        ]);
        let provider = ScriptedProvider::new(|_: &BatchRequest, _| {
            Ok(echo(&[("はい", "Sure"), ("いいえ", "No")]))
        });
        let settings = settings(20);

        let report = Orchestrator::new(&provider, &settings)
            .run(&mut tm, |_| Ok(()))
            .unwrap();

        assert_eq!(*provider.requests.borrow(), vec![vec!["いいえ".to_string()]]);
        assert_eq!(report.propagated, 1);
        assert_eq!(tm.rows()[0].target, "Yes");
        assert_eq!(tm.rows()[2].target, "Yes");
        assert_eq!(tm.rows()[1].target, "No");
        assert_eq!(tm.rows()[3].target, "");
    }

    #[test]
    fn malformed_reply_is_retried_then_fuzzy_matched_and_cleaned() {
        let mut tm = memory(&[("大好きだよ", "")]);
        let provider = ScriptedProvider::new(|_: &BatchRequest, call| {
            if call == 0 {
                Ok("I cannot answer in JSON".to_string())
            } else {
                Ok(echo(&[("大好きだよ。", "Love you💕😀")]))
            }
        });
        let settings = settings(20);

        let report = Orchestrator::new(&provider, &settings)
            .run(&mut tm, |_| Ok(()))
            .unwrap();

        assert_eq!(report.batches[0].attempts, 2);
        assert_eq!(report.items[0].matched_key.as_deref(), Some("大好きだよ。"));
        assert_eq!(tm.lookup_exact("大好きだよ"), Some("Love you❤"));
    }

    #[test]
    fn backoff_grows_linearly() {
        assert_eq!(backoff(1, 1000), Duration::from_millis(1000));
        assert_eq!(backoff(2, 1000), Duration::from_millis(2000));
        assert_eq!(backoff(3, 250), Duration::from_millis(750));
    }

    #[test]
    fn exhausted_batch_waits_attempt_times_base_delay() {
        let mut tm = memory(&[("壊れた", "")]);
        let provider = ScriptedProvider::new(|_: &BatchRequest, _| {
            Err(ProviderError::Transport("connection reset".into()))
        });
        let settings = TranslatorSettings {
            max_retries: 3,
            base_delay_ms: 1000,
            ..TranslatorSettings::default()
        };
        let delays = RefCell::new(Vec::new());
        let record = |d: Duration| delays.borrow_mut().push(d);
        let orchestrator = Orchestrator {
            provider: &provider,
            settings: &settings,
            sleep: &record,
        };

        let report = orchestrator.run(&mut tm, |_| Ok(())).unwrap();

        assert_eq!(report.batches[0].attempts, 3);
        assert_eq!(
            *delays.borrow(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[test]
    fn checkpoint_errors_stop_the_run() {
        let mut tm = memory(&[("一", ""), ("二", "")]);
        let provider = ScriptedProvider::new(|request: &BatchRequest, _| {
            Ok(echo(&[(request.sources[0].as_str(), "x")]))
        });
        let settings = settings(1);

        let result = Orchestrator::new(&provider, &settings).run(&mut tm, |_| {
            Err(crate::error::CoreError::Config("disk full".into()))
        });

        assert!(result.is_err());
        assert_eq!(provider.calls(), 1);
    }
}
