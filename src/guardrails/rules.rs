use std::path::Path;

use regex::Regex;

use crate::config::{load_json_file, GrammarRuleEntry, PhonemeRuleEntry, RuleFile, RuleLoadPolicy};
use crate::error::EngineError;
use crate::types::{EditKind, EditOp, Policy, Symbol};

/// Inflectional endings tolerated on the first word of a text pattern.
pub(crate) const HEAD_SUFFIXES: [&str; 4] = ["ed", "ing", "es", "s"];

const DEFAULT_PHONEME_CATEGORY: &str = "PHON";
const DEFAULT_PHONEME_REASON: &str = "Accepted phoneme variant";

/// (rule_id, pattern, policy, reason, category, canonical)
#[rustfmt::skip]
const BUILTIN_TEXT_RULES: [(&str, &str, Policy, &str, &str, Option<&str>); 18] = [
    ("SLE-PREP-001", "discuss about", Policy::Suppress, "Accepted SLE preposition use", "PREP", Some("discuss")),
    ("SLE-PREP-002", "comprise of", Policy::Suppress, "Accepted SLE variant", "PREP", Some("comprise")),
    ("SLE-PREP-003", "request for", Policy::Suppress, "Accepted SLE variant", "PREP", Some("request")),
    ("SLE-PREP-004", "conducive for", Policy::Suppress, "Accepted SLE variant", "PREP", Some("conducive to")),
    ("SLE-TAGQ-001", "isn\u{2019}t it", Policy::Review, "Common SLE tag question", "TAGQ", None),
    ("SLE-TAGQ-002", "isn't it", Policy::Review, "Common SLE tag question", "TAGQ", None),
    ("SLE-TAGQ-003", " no?", Policy::Review, "SLE tag particle", "TAGQ", None),
    ("SLE-LEX-001", "poya", Policy::Suppress, "SLE cultural term", "LEX", None),
    ("SLE-LEX-002", "z-score", Policy::Suppress, "SLE academic term", "LEX", None),
    ("SLE-LEX-003", "a/l", Policy::Suppress, "SLE exam term", "LEX", None),
    ("SLE-LEX-004", "o/l", Policy::Suppress, "SLE exam term", "LEX", None),
    ("SLE-LEX-005", "rubber slippers", Policy::Suppress, "SLE lexical item", "LEX", None),
    ("SLE-LEX-006", "three-wheeler", Policy::Suppress, "SLE lexical item", "LEX", None),
    ("SLE-LEX-007", "trishaw", Policy::Suppress, "SLE lexical item", "LEX", None),
    ("SLE-LEX-008", "short eats", Policy::Suppress, "SLE lexical item", "LEX", None),
    ("SLE-LEX-009", "kade", Policy::Suppress, "SLE lexical item", "LEX", None),
    ("SLE-LEX-010", "link language", Policy::Suppress, "SLE lexical/phrase", "LEX", None),
    ("SLE-PV-001", "cope up with", Policy::Review, "Frequent SLE usage; review before change", "PV", None),
];

/// A compiled text guardrail. Immutable once built.
#[derive(Debug, Clone)]
pub struct TextRule {
    pub rule_id: String,
    pub pattern: String,
    pub policy: Policy,
    pub category: String,
    pub reason: String,
    pub canonical_replacement: Option<Vec<Symbol>>,
    head: String,
    regex: Regex,
}

impl TextRule {
    pub fn new(
        rule_id: impl Into<String>,
        pattern: &str,
        policy: Policy,
        category: impl Into<String>,
        reason: impl Into<String>,
        canonical: Option<&str>,
    ) -> Result<Self, regex::Error> {
        let normalized = pattern.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let regex = compile_pattern(&normalized)?;
        let head = normalized
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string();
        let canonical_replacement = canonical
            .map(|c| c.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty());
        Ok(Self {
            rule_id: rule_id.into(),
            pattern: normalized,
            policy,
            category: category.into(),
            reason: reason.into(),
            canonical_replacement,
            head,
            regex,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Uninflected first word of the pattern.
    pub fn head(&self) -> &str {
        &self.head
    }
}

/// Builds the case-insensitive matcher for one whitespace-normalized pattern.
///
/// The first word takes an optional inflectional ending when it ends in a word
/// character. Word boundaries are only asserted on sides where the pattern itself
/// starts or ends with a word character.
fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let mut words = pattern.split(' ').filter(|w| !w.is_empty());
    let Some(head) = words.next() else {
        return Regex::new(r"\b\B");
    };

    let mut body = regex::escape(head);
    if head.chars().next_back().is_some_and(is_word_char) {
        body.push_str(&format!("(?:{})?", HEAD_SUFFIXES.join("|")));
    }
    for word in words {
        body.push_str(r"\s+");
        body.push_str(&regex::escape(word));
    }

    let leading = if pattern.chars().next().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let trailing = if pattern.chars().next_back().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    Regex::new(&format!("(?i){leading}{body}{trailing}"))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, Default)]
pub struct TextRuleTable {
    rules: Vec<TextRule>,
}

impl TextRuleTable {
    pub fn new(rules: Vec<TextRule>) -> Self {
        Self { rules }
    }

    /// The built-in Sri Lankan English guardrails.
    pub fn builtin() -> Self {
        let rules = BUILTIN_TEXT_RULES
            .iter()
            .filter_map(|&(rule_id, pattern, policy, reason, category, canonical)| {
                match TextRule::new(rule_id, pattern, policy, category, reason, canonical) {
                    Ok(rule) => Some(rule),
                    Err(err) => {
                        tracing::warn!(
                            rule_id,
                            error = %err,
                            "built-in guardrail failed to compile"
                        );
                        None
                    }
                }
            })
            .collect();
        Self { rules }
    }

    pub fn load(path: &Path, load_policy: RuleLoadPolicy) -> Result<Self, EngineError> {
        let file: RuleFile<GrammarRuleEntry> =
            load_json_file(path, "read grammar rules", "parse grammar rules")?;
        Self::from_entries(file.rules, load_policy)
    }

    pub fn from_entries(
        entries: Vec<GrammarRuleEntry>,
        load_policy: RuleLoadPolicy,
    ) -> Result<Self, EngineError> {
        let mut rules = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match compile_text_entry(index, entry) {
                Ok(rule) => rules.push(rule),
                Err(err) => skip_or_fail(load_policy, err, "grammar")?,
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[TextRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_text_entry(index: usize, entry: GrammarRuleEntry) -> Result<TextRule, EngineError> {
    let rule_id = required(index, "rule_id", entry.rule_id)?;
    let pattern = required(index, "pattern", entry.pattern)?;
    if pattern.split_whitespace().next().is_none() {
        return Err(EngineError::rule_config(index, "pattern", "pattern is blank"));
    }
    let policy = parse_policy(index, entry.policy.as_deref())?
        .ok_or_else(|| EngineError::rule_config(index, "policy", "missing or blank"))?;
    let category = required(index, "category", entry.category)?;
    TextRule::new(
        rule_id,
        &pattern,
        policy,
        category,
        entry.reason.unwrap_or_default(),
        entry.canonical.as_deref(),
    )
    .map_err(|e| EngineError::rule_config(index, "pattern", e.to_string()))
}

/// Phoneme guardrail over one alignment op shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonemeRule {
    pub rule_id: String,
    pub kind: EditKind,
    /// Reference phone; unused for insertions.
    pub expected: Option<Symbol>,
    /// Observed phone; unused for deletions.
    pub observed: Option<Symbol>,
    pub policy: Policy,
    pub category: String,
    pub reason: String,
}

impl PhonemeRule {
    pub fn new(kind: EditKind, expected: Option<&str>, observed: Option<&str>) -> Self {
        let expected = expected.map(str::to_uppercase);
        let observed = observed.map(str::to_uppercase);
        let rule_id = format!(
            "PH-{}-{}-{}",
            kind.as_str(),
            expected.as_deref().unwrap_or("_"),
            observed.as_deref().unwrap_or("_")
        );
        Self {
            rule_id,
            kind,
            expected,
            observed,
            policy: Policy::Suppress,
            category: DEFAULT_PHONEME_CATEGORY.to_string(),
            reason: DEFAULT_PHONEME_REASON.to_string(),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn matches(&self, op: &EditOp) -> bool {
        if op.kind != self.kind {
            return false;
        }
        let same = |rule: &Option<Symbol>, seen: &Option<Symbol>| match (rule, seen) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        match self.kind {
            EditKind::Substitute => {
                same(&self.expected, &op.expected) && same(&self.observed, &op.observed)
            }
            EditKind::Insert => same(&self.observed, &op.observed),
            EditKind::Delete => same(&self.expected, &op.expected),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhonemeRuleTable {
    rules: Vec<PhonemeRule>,
}

impl PhonemeRuleTable {
    pub fn new(rules: Vec<PhonemeRule>) -> Self {
        Self { rules }
    }

    pub fn load(path: &Path, load_policy: RuleLoadPolicy) -> Result<Self, EngineError> {
        let file: RuleFile<PhonemeRuleEntry> =
            load_json_file(path, "read phoneme rules", "parse phoneme rules")?;
        Self::from_entries(file.rules, load_policy)
    }

    /// Compiles raw entries; disabled entries are dropped silently.
    pub fn from_entries(
        entries: Vec<PhonemeRuleEntry>,
        load_policy: RuleLoadPolicy,
    ) -> Result<Self, EngineError> {
        let mut rules = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            if entry.enabled == Some(false) {
                continue;
            }
            match compile_phoneme_entry(index, entry) {
                Ok(rule) => rules.push(rule),
                Err(err) => skip_or_fail(load_policy, err, "phoneme")?,
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[PhonemeRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_phoneme_entry(
    index: usize,
    entry: PhonemeRuleEntry,
) -> Result<PhonemeRule, EngineError> {
    let raw_kind = required(index, "type", entry.kind)?;
    let kind = EditKind::parse(&raw_kind).ok_or_else(|| {
        EngineError::rule_config(index, "type", format!("unknown op type {raw_kind:?}"))
    })?;
    let gold = non_blank(entry.gold);
    let pred = non_blank(entry.pred);
    match kind {
        EditKind::Substitute if gold.is_none() || pred.is_none() => {
            return Err(EngineError::rule_config(
                index,
                "gold/pred",
                "substitution rules need both gold and pred",
            ));
        }
        EditKind::Insert if pred.is_none() => {
            return Err(EngineError::rule_config(index, "pred", "insertion rules need pred"));
        }
        EditKind::Delete if gold.is_none() => {
            return Err(EngineError::rule_config(index, "gold", "deletion rules need gold"));
        }
        _ => {}
    }

    let mut rule = PhonemeRule::new(kind, gold.as_deref(), pred.as_deref());
    if let Some(policy) = parse_policy(index, entry.policy.as_deref())? {
        rule.policy = policy;
    }
    if let Some(rule_id) = non_blank(entry.rule_id) {
        rule.rule_id = rule_id;
    }
    if let Some(category) = non_blank(entry.category) {
        rule.category = category;
    }
    if let Some(reason) = non_blank(entry.reason) {
        rule.reason = reason;
    }
    Ok(rule)
}

fn required(
    index: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<String, EngineError> {
    non_blank(value).ok_or_else(|| EngineError::rule_config(index, field, "missing or blank"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_policy(index: usize, raw: Option<&str>) -> Result<Option<Policy>, EngineError> {
    match raw {
        None => Ok(None),
        Some(raw) => Policy::parse(raw).map(Some).ok_or_else(|| {
            EngineError::rule_config(index, "policy", format!("unknown policy {raw:?}"))
        }),
    }
}

fn skip_or_fail(
    load_policy: RuleLoadPolicy,
    err: EngineError,
    table: &'static str,
) -> Result<(), EngineError> {
    match load_policy {
        RuleLoadPolicy::FailFast => Err(err),
        RuleLoadPolicy::SkipInvalid => {
            tracing::warn!(table, error = %err, "skipping invalid guardrail rule");
            Ok(())
        }
    }
}
