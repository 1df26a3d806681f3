use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A phoneme label (uppercase ARPABET-like) or a whitespace-delimited word token.
pub type Symbol = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditKind {
    #[serde(rename = "S")]
    Substitute,
    #[serde(rename = "I")]
    Insert,
    #[serde(rename = "D")]
    Delete,
}

impl EditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Substitute => "S",
            Self::Insert => "I",
            Self::Delete => "D",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "S" | "SUB" | "SUBSTITUTE" => Some(Self::Substitute),
            "I" | "INS" | "INSERT" => Some(Self::Insert),
            "D" | "DEL" | "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One alignment outcome between a reference and an observed sequence.
///
/// `expected_index` is the reference position the op applies to; for an insertion
/// it is the reference position the observed symbol lands in front of.
/// `observed_index` mirrors that for the observed sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOp {
    #[serde(rename = "op")]
    pub kind: EditKind,
    #[serde(alias = "g")]
    pub expected: Option<Symbol>,
    #[serde(alias = "p")]
    pub observed: Option<Symbol>,
    #[serde(alias = "i")]
    pub expected_index: usize,
    #[serde(alias = "j")]
    pub observed_index: usize,
}

impl EditOp {
    pub fn substitute(
        expected: impl Into<Symbol>,
        observed: impl Into<Symbol>,
        expected_index: usize,
        observed_index: usize,
    ) -> Self {
        Self {
            kind: EditKind::Substitute,
            expected: Some(expected.into()),
            observed: Some(observed.into()),
            expected_index,
            observed_index,
        }
    }

    pub fn insert(
        observed: impl Into<Symbol>,
        expected_index: usize,
        observed_index: usize,
    ) -> Self {
        Self {
            kind: EditKind::Insert,
            expected: None,
            observed: Some(observed.into()),
            expected_index,
            observed_index,
        }
    }

    pub fn delete(
        expected: impl Into<Symbol>,
        expected_index: usize,
        observed_index: usize,
    ) -> Self {
        Self {
            kind: EditKind::Delete,
            expected: Some(expected.into()),
            observed: None,
            expected_index,
            observed_index,
        }
    }

    /// Half-open reference range touched by this op.
    pub fn expected_range(&self) -> (usize, usize) {
        match self.kind {
            EditKind::Insert => (self.expected_index, self.expected_index),
            EditKind::Substitute | EditKind::Delete => {
                (self.expected_index, self.expected_index + 1)
            }
        }
    }
}

/// Half-open token range `[start, end)` over the source sequence plus the text it covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    #[serde(rename = "start_tok")]
    pub start: usize,
    #[serde(rename = "end_tok")]
    pub end: usize,
    pub text: String,
}

impl Span {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn from_tokens(tokens: &[Symbol], start: usize, end: usize) -> Self {
        let end = end.min(tokens.len());
        let start = start.min(end);
        Self::new(start, end, tokens[start..end].join(" "))
    }

    pub fn empty() -> Self {
        Self::new(0, 0, String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }

    /// Overlap, or two insertions anchored at the same point.
    pub fn conflicts_with(&self, other: &Span) -> bool {
        self.overlaps(other) || (self.is_empty() && other.is_empty() && self.start == other.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    /// Never auto-apply an edit on the covered span.
    #[serde(rename = "suppress", alias = "suppress_autocorrect")]
    Suppress,
    /// Apply normally but surface the hit for manual review.
    #[serde(rename = "review", alias = "suggest_review")]
    Review,
}

impl Policy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "suppress" | "suppress_autocorrect" => Some(Self::Suppress),
            "review" | "suggest_review" => Some(Self::Review),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Suppress => "suppress",
            Self::Review => "review",
        }
    }
}

/// One rule matched against one span of the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleHit {
    pub rule_id: String,
    /// Position of the rule in its table; lower index wins on conflicts.
    pub rule_index: usize,
    pub policy: Policy,
    pub category: String,
    pub reason: String,
    pub span: Span,
    #[serde(rename = "canonical")]
    pub canonical_replacement: Option<Vec<Symbol>>,
    /// Uninflected head word of the rule pattern, used to re-inflect the canonical form.
    #[serde(skip)]
    pub(crate) pattern_head: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOrigin {
    RuleDerived,
    Diff,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EditType {
    /// Category of the guardrail rule that produced the edit.
    Rule(String),
    Substitute,
    Insert,
    Delete,
    Orthographic,
    Punctuation,
    Verbal,
}

impl EditType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rule(category) => category,
            Self::Substitute => "SUB",
            Self::Insert => "INS",
            Self::Delete => "DEL",
            Self::Orthographic => "ORTH",
            Self::Punctuation => "PUNCT",
            Self::Verbal => "VERB",
        }
    }

    pub fn from_kind(kind: EditKind) -> Self {
        match kind {
            EditKind::Substitute => Self::Substitute,
            EditKind::Insert => Self::Insert,
            EditKind::Delete => Self::Delete,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "SUB" => Self::Substitute,
            "INS" => Self::Insert,
            "DEL" => Self::Delete,
            "ORTH" => Self::Orthographic,
            "PUNCT" => Self::Punctuation,
            "VERB" => Self::Verbal,
            other => Self::Rule(other.to_string()),
        }
    }
}

impl fmt::Display for EditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EditType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EditType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Unified edit over source-token coordinates, whichever side produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edit {
    #[serde(rename = "type")]
    pub edit_type: EditType,
    pub span: Span,
    pub replacement: Vec<Symbol>,
    pub origin: EditOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardrail: Option<RuleHit>,
    /// Alignment op this edit stands for (phoneme side only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<EditOp>,
}

impl Edit {
    pub fn diff(edit_type: EditType, span: Span, replacement: Vec<Symbol>) -> Self {
        Self {
            edit_type,
            span,
            replacement,
            origin: EditOrigin::Diff,
            guardrail: None,
            op: None,
        }
    }

    pub fn rule_derived(hit: RuleHit, replacement: Vec<Symbol>) -> Self {
        Self {
            edit_type: EditType::Rule(hit.category.clone()),
            span: hit.span.clone(),
            replacement,
            origin: EditOrigin::RuleDerived,
            guardrail: Some(hit),
            op: None,
        }
    }

    pub fn with_op(mut self, op: EditOp) -> Self {
        self.op = Some(op);
        self
    }

    pub fn policy(&self) -> Option<Policy> {
        self.guardrail.as_ref().map(|hit| hit.policy)
    }

    /// Whether both edits claim the same material.
    ///
    /// Edits standing for alignment ops conflict only when they stand for the same
    /// op, so consecutive insertions sharing an anchor stay independent.
    pub fn conflicts_with(&self, other: &Edit) -> bool {
        match (&self.op, &other.op) {
            (Some(a), Some(b)) => a == b,
            _ => self.span.conflicts_with(&other.span),
        }
    }

    pub fn replacement_text(&self) -> String {
        self.replacement.join(" ")
    }
}

/// What the policy step decided for one reconciled edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    /// Rule-derived edit whose policy allows application.
    ForceApplied,
    /// Suppressed by its own guardrail or by an overlapping suppress hit.
    ForceBlocked,
    /// Diff edit with no guardrail objection.
    DefaultApplied,
    /// Allowed, but a higher-precedence edit already claimed an overlapping span.
    Superseded,
}

impl EditOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::ForceApplied | Self::DefaultApplied)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedEdit {
    #[serde(flatten)]
    pub edit: Edit,
    pub outcome: EditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weakness: Option<String>,
}

/// Two rule-derived edits that claim overlapping spans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOverlap {
    pub preferred_rule_id: String,
    pub preferred_span: Span,
    pub other_rule_id: String,
    pub other_span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceWord {
    pub word: String,
    pub phones: Vec<Symbol>,
}

/// Reference side of a phoneme analysis, as produced by a grapheme-to-phoneme step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceInput {
    #[serde(default)]
    pub text: String,
    /// Flat reference phones. When empty, the concatenation of `words` phones is used.
    #[serde(default)]
    pub phones: Vec<Symbol>,
    #[serde(default)]
    pub words: Vec<ReferenceWord>,
}

impl ReferenceInput {
    pub fn from_words(text: impl Into<String>, words: Vec<ReferenceWord>) -> Self {
        let phones = words.iter().flat_map(|w| w.phones.iter().cloned()).collect();
        Self {
            text: text.into(),
            phones,
            words,
        }
    }

    pub fn flat_phones(&self) -> Vec<Symbol> {
        if self.phones.is_empty() {
            self.words
                .iter()
                .flat_map(|w| w.phones.iter().cloned())
                .collect()
        } else {
            self.phones.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhonemeInput {
    /// Observed phones from an upstream recognizer.
    #[serde(default)]
    pub observed: Option<Vec<Symbol>>,
    /// Per-frame log-probabilities, decoded greedily when `observed` is absent.
    #[serde(default)]
    pub frame_log_probs: Option<Vec<Vec<f32>>>,
    /// Already-phonemized reference.
    #[serde(default)]
    pub reference: Option<ReferenceInput>,
    /// Reference text to phonemize with the configured grapheme-to-phoneme collaborator.
    #[serde(default)]
    pub reference_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WordMappingQuality {
    Exact,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordAnalysis {
    pub word: String,
    pub is_correct: bool,
    pub phoneme_errors: Vec<EditOp>,
    pub categories: Vec<String>,
    pub mapping: WordMappingQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceSection {
    pub text: String,
    pub phones: Vec<Symbol>,
    pub words: Vec<ReferenceWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignSection {
    pub ops_raw: Vec<EditOp>,
    pub per_strict: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardrailSection {
    pub ops_after_rules: Vec<EditOp>,
    pub dropped_by_rules: Vec<EditOp>,
    pub flagged_for_review: Vec<EditOp>,
    pub per_sle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhonemeAnalysis {
    pub pred_phones: Vec<Symbol>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<AlignSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sle: Option<GuardrailSection>,
    pub edits: Vec<AppliedEdit>,
    pub guardrails: Vec<RuleHit>,
    pub final_phones: Vec<Symbol>,
    pub word_analysis: Vec<WordAnalysis>,
    pub weakness_categories: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrammarInput {
    pub text: String,
    /// Corrected candidate from an upstream model; when absent the configured
    /// grammar corrector is asked for one.
    #[serde(default)]
    pub candidate: Option<String>,
    #[serde(default = "default_true", alias = "sle_mode")]
    pub guardrails_enabled: bool,
    #[serde(default = "default_true")]
    pub return_edits: bool,
}

impl GrammarInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            candidate: None,
            guardrails_enabled: true,
            return_edits: true,
        }
    }

    pub fn with_candidate(mut self, candidate: impl Into<String>) -> Self {
        self.candidate = Some(candidate.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrammarCorrection {
    pub raw_corrected: String,
    /// Empty when the caller asked not to return edits.
    pub edits: Vec<AppliedEdit>,
    /// Applied edits, counted whether or not `edits` is returned.
    pub applied_edits: usize,
    pub final_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrammarMetrics {
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrammarAnalysis {
    pub input: String,
    pub gec: GrammarCorrection,
    pub guardrails: Vec<RuleHit>,
    pub review: Vec<RuleHit>,
    pub conflicts: Vec<RuleOverlap>,
    pub categories: Vec<String>,
    pub metrics: GrammarMetrics,
}
