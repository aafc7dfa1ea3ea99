use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opens a message window; the following 401 lines are its body.
pub const CODE_SHOW_TEXT: i64 = 101;
/// One line of an open message window.
pub const CODE_TEXT_LINE: i64 = 401;
/// Choice prompt; `parameters[0]` holds the captions.
pub const CODE_SHOW_CHOICES: i64 = 102;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Command {
    pub code: i64,
    pub indent: i64,
    pub parameters: Vec<Value>,
}

impl Command {
    pub fn new(code: i64, indent: i64, parameters: Vec<Value>) -> Self {
        Self {
            code,
            indent,
            parameters,
        }
    }
}

pub type CommandList = Vec<Command>;
