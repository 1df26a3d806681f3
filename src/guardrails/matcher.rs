use crate::alignment::tokenization::TokenizedText;
use crate::guardrails::rules::{PhonemeRuleTable, TextRuleTable};
use crate::types::{EditKind, EditOp, RuleHit, Span};

/// A phoneme rule hit together with the alignment op it matched.
#[derive(Debug, Clone, PartialEq)]
pub struct PhonemeHit {
    pub hit: RuleHit,
    pub op: EditOp,
}

/// Every match of every text rule, in rule-table order then match order.
///
/// Overlapping hits are all reported; resolving them is left to reconciliation.
pub fn find_text_hits(text: &TokenizedText, table: &TextRuleTable) -> Vec<RuleHit> {
    let mut hits = Vec::new();
    for (rule_index, rule) in table.rules().iter().enumerate() {
        for found in rule.regex().find_iter(&text.joined) {
            let span = text.locate_span(found.start(), found.end());
            if span.is_empty() {
                tracing::debug!(
                    rule_id = rule.rule_id.as_str(),
                    start = found.start(),
                    "rule match covers no token, ignored"
                );
                continue;
            }
            hits.push(RuleHit {
                rule_id: rule.rule_id.clone(),
                rule_index,
                policy: rule.policy,
                category: rule.category.clone(),
                reason: rule.reason.clone(),
                span,
                canonical_replacement: rule.canonical_replacement.clone(),
                pattern_head: Some(rule.head().to_string()),
            });
        }
    }
    hits
}

/// Raw alignment ops matched by enabled phoneme rules.
///
/// The hit span is the op's footprint on the reference and its canonical replacement
/// is the observed phone, so accepting the hit means accepting the variant.
pub fn find_phoneme_hits(ops: &[EditOp], table: &PhonemeRuleTable) -> Vec<PhonemeHit> {
    let mut hits = Vec::new();
    for (rule_index, rule) in table.rules().iter().enumerate() {
        for op in ops.iter().filter(|op| rule.matches(op)) {
            let (start, end) = op.expected_range();
            let text = match op.kind {
                EditKind::Insert => String::new(),
                EditKind::Substitute | EditKind::Delete => op.expected.clone().unwrap_or_default(),
            };
            hits.push(PhonemeHit {
                hit: RuleHit {
                    rule_id: rule.rule_id.clone(),
                    rule_index,
                    policy: rule.policy,
                    category: rule.category.clone(),
                    reason: rule.reason.clone(),
                    span: Span::new(start, end, text),
                    canonical_replacement: Some(op.observed.iter().cloned().collect()),
                    pattern_head: None,
                },
                op: op.clone(),
            });
        }
    }
    hits
}
