//! Engine-side scripts for script filters and computed fields

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Default script language
pub const DEFAULT_SCRIPT_LANG: &str = "painless";

/// A script assembled line by line with named parameters.
///
/// The script body is passed through untouched; whether it compiles is up
/// to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    lines: Vec<String>,
    params: Map<String, Value>,
    lang: String,
}

impl Script {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            params: Map::new(),
            lang: DEFAULT_SCRIPT_LANG.to_string(),
        }
    }

    /// Append a line of script source
    pub fn add_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Bind a named parameter, replacing any previous value
    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn set_lang(&mut self, lang: impl Into<String>) -> &mut Self {
        self.lang = lang.into();
        self
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Source lines joined with newlines
    pub fn source(&self) -> String {
        self.lines.join("\n")
    }

    /// `{"source": ..., "lang": ..., "params": {...}}`
    pub fn to_json(&self) -> Value {
        json!({
            "source": self.source(),
            "lang": self.lang,
            "params": self.params,
        })
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}
