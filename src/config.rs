use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::EngineError;

/// What to do with a malformed rule table entry at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleLoadPolicy {
    /// Building the engine fails on the first bad entry.
    #[default]
    FailFast,
    /// Bad entries are dropped with a warning.
    SkipInvalid,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `{"rules": [{type, gold, pred, enabled}]}`; no phoneme guardrails when unset.
    pub phoneme_rules_path: Option<String>,
    /// `{"rules": [{rule_id, pattern, policy, reason, category, canonical}]}`.
    pub grammar_rules_path: Option<String>,
    /// Use the built-in grammar guardrails when no grammar rules file is given.
    pub use_builtin_grammar_rules: bool,
    /// `{"substitutions": [{expected, observed, category}]}`; built-in table when unset.
    pub weakness_table_path: Option<String>,
    /// `{"symbol": id}` vocabulary used to decode frame log-probabilities.
    pub phoneme_vocab_path: Option<String>,
    pub blank_id: Option<usize>,
    pub rule_load_policy: RuleLoadPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            phoneme_rules_path: None,
            grammar_rules_path: None,
            use_builtin_grammar_rules: true,
            weakness_table_path: None,
            phoneme_vocab_path: None,
            blank_id: None,
            rule_load_policy: RuleLoadPolicy::FailFast,
        }
    }
}

/// Raw grammar rule entry; required fields are checked when the table is compiled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrammarRuleEntry {
    pub rule_id: Option<String>,
    pub pattern: Option<String>,
    pub policy: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(alias = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub canonical: Option<String>,
}

/// Raw phoneme rule entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhonemeRuleEntry {
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub gold: Option<String>,
    pub pred: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleFile<T> {
    #[serde(default = "Vec::new")]
    pub rules: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeaknessEntry {
    pub expected: String,
    pub observed: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeaknessFile {
    #[serde(default)]
    pub substitutions: Vec<WeaknessEntry>,
}

pub(crate) fn load_json_file<T: DeserializeOwned>(
    path: &Path,
    read_context: &'static str,
    parse_context: &'static str,
) -> Result<T, EngineError> {
    let data = std::fs::read_to_string(path).map_err(|e| EngineError::io(read_context, e))?;
    serde_json::from_str(&data).map_err(|e| EngineError::json(parse_context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_default() {
        let config = EngineConfig::default();
        assert!(config.phoneme_rules_path.is_none());
        assert!(config.grammar_rules_path.is_none());
        assert!(config.use_builtin_grammar_rules);
        assert!(config.weakness_table_path.is_none());
        assert_eq!(config.rule_load_policy, RuleLoadPolicy::FailFast);
    }

    #[test]
    fn grammar_rule_entry_keeps_missing_fields_as_none() {
        let json = r#"{"rules": [
            {"rule_id": "X-1", "pattern": "cope up with", "policy": "suggest_review", "category": "PV"},
            {"pattern": "poya"}
        ]}"#;
        let file: RuleFile<GrammarRuleEntry> = serde_json::from_str(json).expect("valid json");
        assert_eq!(file.rules.len(), 2);
        assert_eq!(file.rules[0].category.as_deref(), Some("PV"));
        assert!(file.rules[0].canonical.is_none());
        assert!(file.rules[1].rule_id.is_none());
    }

    #[test]
    fn phoneme_rule_entry_reads_type_field() {
        let json = r#"{"rules": [{"type": "S", "gold": "dh", "pred": "d", "enabled": true}]}"#;
        let file: RuleFile<PhonemeRuleEntry> = serde_json::from_str(json).expect("valid json");
        assert_eq!(file.rules[0].kind.as_deref(), Some("S"));
        assert_eq!(file.rules[0].enabled, Some(true));
    }

    #[test]
    fn rule_file_without_rules_is_empty() {
        let file: RuleFile<PhonemeRuleEntry> = serde_json::from_str("{}").expect("valid json");
        assert!(file.rules.is_empty());
    }

    #[test]
    fn load_json_file_reports_io_and_parse_errors() {
        let missing: Result<WeaknessFile, _> =
            load_json_file(Path::new("/nonexistent/table.json"), "read", "parse");
        assert!(matches!(missing, Err(EngineError::Io { .. })));

        let path = std::env::temp_dir().join("guardrail_align_config_bad.json");
        std::fs::write(&path, "{not json").expect("write file");
        let bad: Result<WeaknessFile, _> = load_json_file(&path, "read", "parse");
        assert!(matches!(bad, Err(EngineError::Json { .. })));
        let _ = std::fs::remove_file(&path);
    }
}
