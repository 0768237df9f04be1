//! Parser configuration.

use serde::{Deserialize, Serialize};

/// Options controlling a single parse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Keep operations from dialects the registry cannot load as opaque
    /// nodes instead of rejecting them.
    pub allow_unknown_dialects: bool,
    /// Run the structural verifier on the graph after a successful parse.
    pub verify_after_parse: bool,
    /// Name used for source locations and rendered diagnostics.
    pub source_name: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            allow_unknown_dialects: false,
            verify_after_parse: true,
            source_name: "<input>".to_owned(),
        }
    }
}

impl ParserConfig {
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn allow_unknown_dialects(mut self, allow: bool) -> Self {
        self.allow_unknown_dialects = allow;
        self
    }

    pub fn verify_after_parse(mut self, verify: bool) -> Self {
        self.verify_after_parse = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: ParserConfig =
            serde_json::from_str(r#"{ "allow_unknown_dialects": true }"#).unwrap();
        assert!(config.allow_unknown_dialects);
        assert!(config.verify_after_parse);
        assert_eq!(config.source_name, "<input>");
    }
}
