use crate::alignment::tokenization::validate_symbols;
use crate::alignment::word_mapping::map_words_to_phones;
use crate::error::EngineError;
use crate::guardrails::matcher::find_phoneme_hits;
use crate::guardrails::policy::apply_policy;
use crate::guardrails::reconcile::{reconcile, SymbolDomain};
use crate::guardrails::rules::PhonemeRuleTable;
use crate::guardrails::synthesis::synthesize_phoneme_edits;
use crate::pipeline::traits::SequenceAligner;
use crate::types::{
    AlignSection, AppliedEdit, Edit, EditKind, EditOp, EditOutcome, EditType, GuardrailSection,
    PhonemeAnalysis, Policy, ReferenceInput, ReferenceSection, Span, Symbol,
};
use crate::weakness::{collect_categories, label_edits, word_breakdown, WeaknessTable};

pub struct PhonemeContext<'a> {
    pub aligner: &'a dyn SequenceAligner,
    pub rules: &'a PhonemeRuleTable,
    pub weakness: &'a WeaknessTable,
}

/// Aligns observed phones to the reference, runs the guardrails and categorizes
/// what survives.
pub fn analyze_phonemes(
    observed: Vec<Symbol>,
    reference: Option<ReferenceInput>,
    ctx: &PhonemeContext<'_>,
) -> Result<PhonemeAnalysis, EngineError> {
    validate_symbols(&observed, "observed").map_err(EngineError::invalid_input)?;

    let Some(reference) = reference else {
        return Ok(PhonemeAnalysis {
            final_phones: observed.clone(),
            pred_phones: observed,
            reference: None,
            align: None,
            sle: None,
            edits: Vec::new(),
            guardrails: Vec::new(),
            word_analysis: Vec::new(),
            weakness_categories: Vec::new(),
        });
    };
    let ref_phones = reference.flat_phones();
    validate_symbols(&ref_phones, "reference").map_err(EngineError::invalid_input)?;

    let ops_raw = ctx.aligner.align(&ref_phones, &observed);
    let denom = ref_phones.len().max(1);
    let per_strict = error_rate(ops_raw.len(), denom);

    let hits = find_phoneme_hits(&ops_raw, ctx.rules);
    let rule_edits = synthesize_phoneme_edits(&hits);
    let diff_edits = ops_raw.iter().map(diff_edit).collect();
    let guardrails: Vec<_> = hits.into_iter().map(|h| h.hit).collect();

    let reconciled = reconcile(rule_edits, diff_edits, &guardrails, SymbolDomain::Phoneme);
    let policy = apply_policy(&ref_phones, &reconciled);
    let mut edits = policy.edits;
    label_edits(&mut edits, ctx.weakness);

    let ops_after_rules = ops_where(&edits, |e| e.outcome.is_applied());
    let dropped_by_rules = ops_where(&edits, |e| e.outcome == EditOutcome::ForceBlocked);
    let flagged_for_review = ops_where(&edits, |e| {
        e.outcome.is_applied() && e.edit.policy() == Some(Policy::Review)
    });
    let per_sle = error_rate(ops_after_rules.len(), denom);

    let word_analysis = if reference.words.is_empty() {
        Vec::new()
    } else {
        let ranges = map_words_to_phones(&reference.words, &ref_phones);
        word_breakdown(&ranges, &edits)
    };
    let weakness_categories = collect_categories(&edits);

    tracing::debug!(
        ops = ops_raw.len(),
        kept = ops_after_rules.len(),
        dropped = dropped_by_rules.len(),
        per_strict,
        per_sle,
        "phoneme analysis"
    );

    Ok(PhonemeAnalysis {
        pred_phones: observed,
        reference: Some(ReferenceSection {
            text: reference.text,
            phones: ref_phones,
            words: reference.words,
        }),
        align: Some(AlignSection { ops_raw, per_strict }),
        sle: Some(GuardrailSection {
            ops_after_rules,
            dropped_by_rules,
            flagged_for_review,
            per_sle,
        }),
        edits,
        guardrails,
        final_phones: policy.tokens,
        word_analysis,
        weakness_categories,
    })
}

fn diff_edit(op: &EditOp) -> Edit {
    let (start, end) = op.expected_range();
    let text = match op.kind {
        EditKind::Insert => String::new(),
        EditKind::Substitute | EditKind::Delete => op.expected.clone().unwrap_or_default(),
    };
    Edit::diff(
        EditType::from_kind(op.kind),
        Span::new(start, end, text),
        op.observed.iter().cloned().collect(),
    )
    .with_op(op.clone())
}

/// Distinct ops of the matching edits, in alignment order.
fn ops_where(edits: &[AppliedEdit], keep: impl Fn(&AppliedEdit) -> bool) -> Vec<EditOp> {
    let mut ops: Vec<EditOp> = edits
        .iter()
        .filter(|&e| keep(e))
        .filter_map(|e| e.edit.op.clone())
        .collect();
    ops.sort_by_key(|op| (op.expected_index, op.observed_index));
    ops.dedup();
    ops
}

/// `100 * errors / denom`, rounded to two decimals.
fn error_rate(errors: usize, denom: usize) -> f64 {
    (100.0 * errors as f64 / denom as f64 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::guardrails::rules::PhonemeRule;
    use crate::pipeline::defaults::LevenshteinAligner;
    use crate::types::{ReferenceWord, WordMappingQuality};

    const PHONES: [&str; 5] = ["AH", "EH", "K", "S", "T"];

    fn phones(p: &[&str]) -> Vec<Symbol> {
        p.iter().map(|s| s.to_string()).collect()
    }

    fn reference(words: &[(&str, &[&str])]) -> ReferenceInput {
        ReferenceInput::from_words(
            words.iter().map(|(w, _)| *w).collect::<Vec<_>>().join(" "),
            words
                .iter()
                .map(|(w, p)| ReferenceWord {
                    word: w.to_string(),
                    phones: phones(p),
                })
                .collect(),
        )
    }

    fn run(
        observed: &[&str],
        reference: Option<ReferenceInput>,
        rules: &PhonemeRuleTable,
    ) -> PhonemeAnalysis {
        let weakness = WeaknessTable::builtin();
        let ctx = PhonemeContext {
            aligner: &LevenshteinAligner,
            rules,
            weakness: &weakness,
        };
        analyze_phonemes(phones(observed), reference, &ctx).expect("analysis")
    }

    fn th_rule() -> PhonemeRuleTable {
        PhonemeRuleTable::new(vec![PhonemeRule::new(
            EditKind::Substitute,
            Some("DH"),
            Some("D"),
        )])
    }

    #[test]
    fn strict_error_rate_without_rules() {
        let out = run(
            &["D", "IH", "S"],
            Some(reference(&[("this", &["DH", "IH", "S"])])),
            &PhonemeRuleTable::default(),
        );
        let align = out.align.expect("align section");
        assert_eq!(align.ops_raw, vec![EditOp::substitute("DH", "D", 0, 0)]);
        assert_eq!(align.per_strict, 33.33);
        assert_eq!(out.sle.expect("sle section").per_sle, 33.33);
        assert_eq!(out.final_phones, phones(&["D", "IH", "S"]));
        assert_eq!(out.weakness_categories, vec!["th_vs_t"]);
    }

    #[test]
    fn suppressed_variant_is_dropped_but_labelled() {
        let out = run(
            &["D", "IH", "S"],
            Some(reference(&[("this", &["DH", "IH", "S"])])),
            &th_rule(),
        );
        let sle = out.sle.expect("sle section");
        assert_eq!(sle.per_sle, 0.0);
        assert!(sle.ops_after_rules.is_empty());
        assert_eq!(sle.dropped_by_rules, vec![EditOp::substitute("DH", "D", 0, 0)]);
        assert_eq!(out.edits.len(), 1);
        assert_eq!(out.edits[0].outcome, EditOutcome::ForceBlocked);
        assert_eq!(out.edits[0].weakness.as_deref(), Some("th_vs_t"));
        assert!(out.weakness_categories.is_empty());
        assert_eq!(out.final_phones, phones(&["DH", "IH", "S"]));
        assert!(out.word_analysis[0].is_correct);
    }

    #[test]
    fn review_rule_keeps_op_and_flags_it() {
        let rules = PhonemeRuleTable::new(vec![PhonemeRule::new(
            EditKind::Substitute,
            Some("DH"),
            Some("D"),
        )
        .with_policy(Policy::Review)]);
        let out = run(
            &["D", "IH", "S"],
            Some(reference(&[("this", &["DH", "IH", "S"])])),
            &rules,
        );
        let sle = out.sle.expect("sle section");
        assert_eq!(sle.ops_after_rules.len(), 1);
        assert_eq!(sle.flagged_for_review.len(), 1);
        assert_eq!(out.edits[0].outcome, EditOutcome::ForceApplied);
    }

    #[test]
    fn no_reference_only_reports_prediction() {
        let out = run(&["HH", "AY"], None, &th_rule());
        assert_eq!(out.pred_phones, phones(&["HH", "AY"]));
        assert!(out.align.is_none());
        assert!(out.sle.is_none());
        assert!(out.edits.is_empty());
    }

    #[test]
    fn empty_reference_uses_unit_denominator() {
        let out = run(&["AH"], Some(ReferenceInput::from_words("", Vec::new())), &th_rule());
        assert_eq!(out.align.expect("align section").per_strict, 100.0);
        assert_eq!(out.final_phones, phones(&["AH"]));
    }

    #[test]
    fn malformed_observed_symbol_is_invalid_input() {
        let weakness = WeaknessTable::builtin();
        let rules = PhonemeRuleTable::default();
        let ctx = PhonemeContext {
            aligner: &LevenshteinAligner,
            rules: &rules,
            weakness: &weakness,
        };
        let err = analyze_phonemes(phones(&["DH", ""]), None, &ctx).expect_err("empty symbol");
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn word_analysis_attributes_errors() {
        let out = run(
            &["DH", "IH", "S", "IH", "S"],
            Some(reference(&[("this", &["DH", "IH", "S"]), ("is", &["IH", "Z"])])),
            &PhonemeRuleTable::default(),
        );
        assert_eq!(out.word_analysis.len(), 2);
        assert!(out.word_analysis[0].is_correct);
        assert!(!out.word_analysis[1].is_correct);
        assert_eq!(
            out.word_analysis[1].phoneme_errors,
            vec![EditOp::substitute("Z", "S", 4, 4)]
        );
        assert_eq!(out.word_analysis[1].categories, vec!["z_vs_s"]);
        assert_eq!(out.word_analysis[1].mapping, WordMappingQuality::Exact);
    }

    #[test]
    fn consecutive_insertions_at_one_anchor_are_all_kept() {
        let out = run(
            &["K", "AH", "EH", "T"],
            Some(ReferenceInput {
                text: "kt".into(),
                phones: phones(&["K", "T"]),
                words: Vec::new(),
            }),
            &PhonemeRuleTable::default(),
        );
        let align = out.align.expect("align section");
        assert_eq!(
            align.ops_raw,
            vec![EditOp::insert("AH", 1, 1), EditOp::insert("EH", 1, 2)]
        );
        let sle = out.sle.expect("sle section");
        assert_eq!(sle.per_sle, align.per_strict);
        assert_eq!(sle.per_sle, 100.0);
        assert_eq!(out.final_phones, phones(&["K", "AH", "EH", "T"]));
        assert!(out.edits.iter().all(|e| e.outcome == EditOutcome::DefaultApplied));
    }

    #[test]
    fn insertion_rule_only_claims_its_own_op() {
        let rules = PhonemeRuleTable::new(vec![PhonemeRule::new(
            EditKind::Insert,
            None,
            Some("AH"),
        )]);
        let out = run(
            &["K", "AH", "EH", "T"],
            Some(ReferenceInput {
                text: "kt".into(),
                phones: phones(&["K", "T"]),
                words: Vec::new(),
            }),
            &rules,
        );
        let sle = out.sle.expect("sle section");
        assert_eq!(sle.ops_after_rules, vec![EditOp::insert("EH", 1, 2)]);
        assert_eq!(sle.dropped_by_rules, vec![EditOp::insert("AH", 1, 1)]);
        assert_eq!(sle.per_sle, 50.0);
        assert_eq!(out.final_phones, phones(&["K", "EH", "T"]));
    }

    #[test]
    fn without_rules_final_phones_replay_the_alignment() {
        let mut rng = StdRng::seed_from_u64(2024);
        let random_phones = |rng: &mut StdRng| -> Vec<Symbol> {
            let len = rng.gen_range(0..=8);
            (0..len)
                .map(|_| PHONES[rng.gen_range(0..PHONES.len())].to_string())
                .collect()
        };
        let rules = PhonemeRuleTable::default();
        for _ in 0..300 {
            let expected = random_phones(&mut rng);
            let observed = random_phones(&mut rng);
            let obs: Vec<&str> = observed.iter().map(String::as_str).collect();
            let out = run(
                &obs,
                Some(ReferenceInput {
                    text: String::new(),
                    phones: expected.clone(),
                    words: Vec::new(),
                }),
                &rules,
            );
            let align = out.align.expect("align section");
            let sle = out.sle.expect("sle section");
            assert_eq!(out.final_phones, observed, "expected={expected:?}");
            assert_eq!(sle.per_sle, align.per_strict, "expected={expected:?}");
            assert_eq!(sle.ops_after_rules, align.ops_raw);
            assert_eq!(
                LevenshteinAligner.align(&expected, &out.final_phones),
                align.ops_raw,
                "expected={expected:?} observed={observed:?}"
            );
        }
    }
}
