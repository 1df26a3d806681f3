use crate::guardrails::matcher::PhonemeHit;
use crate::guardrails::rules::HEAD_SUFFIXES;
use crate::types::{Edit, RuleHit, Symbol};

/// One rule-derived edit per hit that carries a canonical replacement.
///
/// Flag-only hits produce nothing here; they still act as suppression zones later.
pub fn synthesize_edits(hits: &[RuleHit]) -> Vec<Edit> {
    hits.iter()
        .filter_map(|hit| {
            let canonical = hit.canonical_replacement.as_ref()?;
            Some(Edit::rule_derived(hit.clone(), reinflect(hit, canonical)))
        })
        .collect()
}

/// Phoneme hits always carry the observed phone (or nothing, for deletions).
pub fn synthesize_phoneme_edits(hits: &[PhonemeHit]) -> Vec<Edit> {
    hits.iter()
        .map(|PhonemeHit { hit, op }| {
            let replacement = hit.canonical_replacement.clone().unwrap_or_default();
            Edit::rule_derived(hit.clone(), replacement).with_op(op.clone())
        })
        .collect()
}

fn reinflect(hit: &RuleHit, canonical: &[Symbol]) -> Vec<Symbol> {
    let (Some(base), Some(pattern_head)) = (canonical.first(), hit.pattern_head.as_deref()) else {
        return canonical.to_vec();
    };
    let observed_head = hit.span.text.split_whitespace().next().unwrap_or_default();
    let mut out = Vec::with_capacity(canonical.len());
    out.push(inflect_like(observed_head, pattern_head, base));
    out.extend(canonical[1..].iter().cloned());
    out
}

/// Carries the inflection of `observed_head` over to `base`.
///
/// The suffix is whatever `observed_head` has beyond `pattern_head`; only `ed`,
/// `ing`, `es` and `s` are carried, anything else yields `base` unchanged.
pub fn inflect_like(observed_head: &str, pattern_head: &str, base: &str) -> String {
    let observed = observed_head
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    let suffix = observed
        .strip_prefix(&pattern_head.to_lowercase())
        .unwrap_or_default();
    if HEAD_SUFFIXES.contains(&suffix) {
        format!("{base}{suffix}")
    } else {
        base.to_string()
    }
}
