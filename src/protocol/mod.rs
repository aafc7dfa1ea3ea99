use serde_json::{json, Value};
use tracing::{debug, error};

mod command;
mod handlers;
use command::Command;

fn get_cmd(req: &Value) -> &str {
    req.get("cmd").and_then(|v| v.as_str()).unwrap_or("")
}

fn get_id(req: &Value) -> Value {
    req.get("id").cloned().unwrap_or(Value::Null)
}

fn get_payload(req: &Value) -> &Value {
    static EMPTY: Value = Value::Null;
    req.get("payload").unwrap_or(&EMPTY)
}

fn ok(id: Value, payload: Value) -> String {
    json!({
        "id": id,
        "status": "ok",
        "payload": payload
    })
    .to_string()
}

fn err(id: Value, message: impl Into<String>) -> String {
    json!({
        "id": id,
        "status": "error",
        "message": message.into()
    })
    .to_string()
}

pub fn handle(input: &str) -> String {
    let req: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(_) => {
            return json!({
                "status": "error",
                "message": "invalid json"
            })
            .to_string();
        }
    };

    let id = get_id(&req);
    let cmd_str = get_cmd(&req);
    let payload = get_payload(&req);

    debug!(cmd = cmd_str, "request");

    let result = match Command::from(cmd_str) {
        Command::Ping => Ok(json!({ "message": "rpgm-text-core alive" })),
        Command::CorpusExtract => handlers::corpus_extract(payload),
        Command::CorpusPatch => handlers::corpus_patch(payload),
        Command::MemoryTranslate => handlers::memory_translate(payload),
        Command::MemoryClean => handlers::memory_clean(payload),
        Command::MemoryCheck => handlers::memory_check(payload),
        Command::NotesExtract => handlers::notes_extract(payload),
        Command::NotesApply => handlers::notes_apply(payload),
        Command::PluginsExtract => handlers::plugins_extract(payload),
        Command::PluginsApply => handlers::plugins_apply(payload),
        Command::PluginsCheck => handlers::plugins_check(payload),
        Command::Unknown => return err(id, "unknown command"),
    };

    match result {
        Ok(payload) => ok(id, payload),
        Err(e) => {
            error!(cmd = cmd_str, "{e}");
            err(id, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(line: &str) -> Value {
        serde_json::from_str(&handle(line)).unwrap()
    }

    #[test]
    fn ping_echoes_the_id() {
        let resp = call(r#"{"id": 7, "cmd": "ping"}"#);
        assert_eq!(resp["id"], 7);
        assert_eq!(resp["status"], "ok");
    }

    #[test]
    fn bad_requests_become_error_responses() {
        assert_eq!(call("not json")["status"], "error");

        let resp = call(r#"{"id": "a", "cmd": "nope"}"#);
        assert_eq!(resp["message"], "unknown command");

        let resp = call(r#"{"id": "b", "cmd": "corpus.extract", "payload": {}}"#);
        assert_eq!(resp["status"], "error");
        assert!(resp["message"].as_str().unwrap().contains("payload.data_dir"));
    }

    #[test]
    fn extract_then_patch_through_the_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(
            data.join("Actors.json"),
            r#"[null,{"id":1,"name":"ハロルド","nickname":"","profile":"","note":""}]"#,
        )
        .unwrap();
        let memory = dir.path().join("translations.csv");

        let request = json!({
            "id": 1,
            "cmd": "corpus.extract",
            "payload": { "data_dir": data, "memory_path": memory }
        });
        let resp = call(&request.to_string());
        assert_eq!(resp["payload"]["added"], 1);

        let sheet = std::fs::read_to_string(&memory).unwrap();
        std::fs::write(&memory, sheet.replace("ハロルド,,,", "ハロルド,,Harold,")).unwrap();

        let request = json!({
            "id": 2,
            "cmd": "corpus.patch",
            "payload": { "data_dir": data, "memory_path": memory }
        });
        let resp = call(&request.to_string());
        assert_eq!(resp["payload"]["written"], json!(["Actors.json"]));

        let actors = std::fs::read_to_string(data.join("Actors.json")).unwrap();
        assert!(actors.contains(r#""name":"Harold""#));
    }

    #[test]
    fn notes_commands_honor_scope() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Classes.json"),
            r#"[null,{"id":1,"name":"剣士","note":"<職業:剣>"}]"#,
        )
        .unwrap();
        let notes = dir.path().join("notes_map.json");

        let request = json!({
            "id": 1,
            "cmd": "notes.extract",
            "payload": { "data_dir": dir.path(), "notes_path": notes, "scope": "data" }
        });
        assert_eq!(call(&request.to_string())["payload"]["notes"], 1);

        std::fs::write(&notes, r#"{"Class_1":"<class:sword>"}"#).unwrap();
        let request = json!({
            "id": 2,
            "cmd": "notes.apply",
            "payload": { "data_dir": dir.path(), "notes_path": notes }
        });
        let resp = call(&request.to_string());
        assert_eq!(resp["payload"]["files_changed"], json!(["Classes.json"]));

        let request = json!({
            "id": 3,
            "cmd": "notes.apply",
            "payload": { "data_dir": dir.path(), "notes_path": notes, "scope": "maps" }
        });
        assert_eq!(call(&request.to_string())["status"], "error");
    }
}
