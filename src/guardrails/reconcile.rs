use crate::types::{Edit, EditOrigin, EditType, Policy, RuleHit, RuleOverlap};

const AUXILIARY_VERBS: [&str; 14] = [
    "am", "is", "are", "was", "were", "be", "being", "been", "has", "have", "had", "do", "does",
    "did",
];
const VERB_ENDINGS: [&str; 3] = ["ed", "ing", "es"];

/// What the edits are made of; word heuristics only make sense on words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolDomain {
    Word,
    Phoneme,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// Rule-derived edits by (rule index, span start), then diff edits by span.
    pub edits: Vec<Edit>,
    /// Suppress hits; any edit overlapping one is blocked.
    pub suppression_zones: Vec<RuleHit>,
    pub rule_overlaps: Vec<RuleOverlap>,
}

/// Precedence of an edit among its peers: lower sorts first.
pub(crate) fn precedence_key(edit: &Edit) -> (usize, usize, usize) {
    let rule_index = edit
        .guardrail
        .as_ref()
        .map(|hit| hit.rule_index)
        .unwrap_or(usize::MAX);
    (rule_index, edit.span.start, edit.span.end)
}

/// Merges rule-derived and diff edits; rule-derived edits always win a conflict.
pub fn reconcile(
    mut rule_edits: Vec<Edit>,
    diff_edits: Vec<Edit>,
    hits: &[RuleHit],
    domain: SymbolDomain,
) -> Reconciled {
    rule_edits.sort_by_key(precedence_key);

    let mut rule_overlaps = Vec::new();
    for (idx, preferred) in rule_edits.iter().enumerate() {
        for other in &rule_edits[idx + 1..] {
            if !preferred.conflicts_with(other) {
                continue;
            }
            let (Some(a), Some(b)) = (&preferred.guardrail, &other.guardrail) else {
                continue;
            };
            tracing::debug!(
                preferred = a.rule_id.as_str(),
                other = b.rule_id.as_str(),
                start = other.span.start,
                "overlapping rule-derived edits"
            );
            rule_overlaps.push(RuleOverlap {
                preferred_rule_id: a.rule_id.clone(),
                preferred_span: preferred.span.clone(),
                other_rule_id: b.rule_id.clone(),
                other_span: other.span.clone(),
            });
        }
    }

    let total_diff = diff_edits.len();
    let mut kept: Vec<Edit> = diff_edits
        .into_iter()
        .filter(|edit| {
            !rule_edits
                .iter()
                .any(|rule_edit| rule_edit.conflicts_with(edit))
        })
        .map(|mut edit| {
            if domain == SymbolDomain::Word && edit.origin == EditOrigin::Diff {
                edit.edit_type = classify_edit(&edit);
            }
            edit
        })
        .collect();
    kept.sort_by_key(|edit| (edit.span.start, edit.span.end));
    if kept.len() < total_diff {
        tracing::debug!(
            dropped = total_diff - kept.len(),
            "diff edits superseded by rule-derived edits"
        );
    }

    let suppression_zones = hits
        .iter()
        .filter(|hit| hit.policy == Policy::Suppress)
        .cloned()
        .collect();

    let mut edits = rule_edits;
    edits.extend(kept);
    Reconciled {
        edits,
        suppression_zones,
        rule_overlaps,
    }
}

/// Coarse label for a word-level diff edit no guardrail claimed.
pub fn classify_edit(edit: &Edit) -> EditType {
    let source = edit.span.text.as_str();
    let replacement = edit.replacement_text();

    if !source.is_empty()
        && !replacement.is_empty()
        && source != replacement
        && source.to_lowercase() == replacement.to_lowercase()
    {
        return EditType::Orthographic;
    }
    if is_punctuation(source) || is_punctuation(&replacement) {
        return EditType::Punctuation;
    }

    let source_head = head_token(source);
    let replacement_head = head_token(&replacement);
    if looks_verbal(&source_head) || looks_verbal(&replacement_head) {
        return EditType::Verbal;
    }
    edit.edit_type.clone()
}

fn is_punctuation(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| !c.is_alphanumeric() && c != '_' && !c.is_whitespace())
}

fn head_token(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn looks_verbal(token: &str) -> bool {
    AUXILIARY_VERBS.contains(&token) || VERB_ENDINGS.iter().any(|end| token.ends_with(end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Span;

    fn rule_edit(rule_index: usize, start: usize, end: usize, policy: Policy) -> Edit {
        let hit = RuleHit {
            rule_id: format!("R{rule_index}"),
            rule_index,
            policy,
            category: "PREP".to_string(),
            reason: String::new(),
            span: Span::new(start, end, "x"),
            canonical_replacement: Some(vec!["y".to_string()]),
            pattern_head: None,
        };
        Edit::rule_derived(hit, vec!["y".to_string()])
    }

    fn diff(kind: EditType, start: usize, end: usize, text: &str, replacement: &str) -> Edit {
        Edit::diff(
            kind,
            Span::new(start, end, text),
            replacement.split_whitespace().map(str::to_string).collect(),
        )
    }

    #[test]
    fn rule_edit_wins_over_overlapping_diff_edit() {
        let rule = rule_edit(0, 0, 2, Policy::Suppress);
        let diffs = vec![
            diff(EditType::Delete, 1, 2, "about", ""),
            diff(EditType::Substitute, 2, 3, "homework", "homeworks"),
        ];
        let out = reconcile(vec![rule], diffs, &[], SymbolDomain::Word);
        assert_eq!(out.edits.len(), 2);
        assert_eq!(out.edits[0].origin, EditOrigin::RuleDerived);
        assert_eq!(out.edits[1].span.start, 2);
    }

    #[test]
    fn duplicate_insertion_at_same_point_is_dropped() {
        let mut rule = rule_edit(0, 3, 3, Policy::Review);
        rule.span = Span::new(3, 3, "");
        let diffs = vec![diff(EditType::Insert, 3, 3, "", "AH")];
        let out = reconcile(vec![rule], diffs, &[], SymbolDomain::Phoneme);
        assert_eq!(out.edits.len(), 1);
        assert_eq!(out.edits[0].origin, EditOrigin::RuleDerived);
    }

    #[test]
    fn rule_edits_sorted_by_index_then_start_and_overlaps_reported() {
        let edits = vec![
            rule_edit(2, 0, 1, Policy::Review),
            rule_edit(1, 4, 6, Policy::Review),
            rule_edit(1, 0, 2, Policy::Review),
        ];
        let out = reconcile(edits, Vec::new(), &[], SymbolDomain::Word);
        let order: Vec<_> = out
            .edits
            .iter()
            .map(|e| (e.guardrail.as_ref().map(|h| h.rule_index), e.span.start))
            .collect();
        assert_eq!(order, vec![(Some(1), 0), (Some(1), 4), (Some(2), 0)]);
        assert_eq!(out.rule_overlaps.len(), 1);
        assert_eq!(out.rule_overlaps[0].preferred_rule_id, "R1");
        assert_eq!(out.rule_overlaps[0].other_rule_id, "R2");
    }

    #[test]
    fn suppression_zones_hold_only_suppress_hits() {
        let suppress = rule_edit(0, 0, 1, Policy::Suppress).guardrail;
        let review = rule_edit(1, 2, 3, Policy::Review).guardrail;
        let hits: Vec<RuleHit> = suppress.into_iter().chain(review).collect();
        let out = reconcile(Vec::new(), Vec::new(), &hits, SymbolDomain::Word);
        assert_eq!(out.suppression_zones.len(), 1);
        assert_eq!(out.suppression_zones[0].rule_id, "R0");
    }

    #[test]
    fn classification_heuristics() {
        let verb = diff(EditType::Substitute, 1, 2, "go", "goes");
        assert_eq!(classify_edit(&verb), EditType::Verbal);

        let orth = diff(EditType::Substitute, 0, 1, "english", "English");
        assert_eq!(classify_edit(&orth), EditType::Orthographic);

        let punct = diff(EditType::Insert, 3, 3, "", ",");
        assert_eq!(classify_edit(&punct), EditType::Punctuation);

        let aux = diff(EditType::Insert, 1, 1, "", "is");
        assert_eq!(classify_edit(&aux), EditType::Verbal);

        let other = diff(EditType::Delete, 2, 3, "the", "");
        assert_eq!(classify_edit(&other), EditType::Delete);
    }

    #[test]
    fn phoneme_diff_edits_keep_raw_kind() {
        let diffs = vec![diff(EditType::Substitute, 0, 1, "AE", "EH")];
        let out = reconcile(Vec::new(), diffs, &[], SymbolDomain::Phoneme);
        assert_eq!(out.edits[0].edit_type, EditType::Substitute);
    }

    #[test]
    fn diff_edits_ordered_by_span() {
        let diffs = vec![
            diff(EditType::Delete, 4, 5, "a", ""),
            diff(EditType::Delete, 1, 2, "b", ""),
        ];
        let out = reconcile(Vec::new(), diffs, &[], SymbolDomain::Word);
        assert_eq!(out.edits[0].span.start, 1);
        assert_eq!(out.edits[1].span.start, 4);
    }
}
