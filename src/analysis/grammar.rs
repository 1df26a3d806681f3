use crate::alignment::tokenization::TokenizedText;
use crate::guardrails::matcher::find_text_hits;
use crate::guardrails::policy::apply_policy;
use crate::guardrails::reconcile::{reconcile, SymbolDomain};
use crate::guardrails::rules::TextRuleTable;
use crate::guardrails::synthesis::synthesize_edits;
use crate::pipeline::traits::{GrammarCategorizer, SequenceAligner};
use crate::types::{
    Edit, EditType, GrammarAnalysis, GrammarCorrection, GrammarInput, GrammarMetrics, Policy,
    Span, Symbol,
};

pub struct GrammarContext<'a> {
    pub aligner: &'a dyn SequenceAligner,
    pub rules: &'a TextRuleTable,
    pub categorizer: &'a dyn GrammarCategorizer,
}

/// Reconciles a corrected candidate with the guardrails matched on the source text.
///
/// `metrics.latency_ms` is left at zero for the caller to fill in.
pub fn analyze_grammar(
    input: &GrammarInput,
    candidate: &str,
    ctx: &GrammarContext<'_>,
) -> GrammarAnalysis {
    let source = TokenizedText::new(&input.text);
    let candidate_tokens: Vec<Symbol> = candidate.split_whitespace().map(str::to_string).collect();

    let diff_edits: Vec<Edit> = ctx
        .aligner
        .diff_tokens(&source.tokens, &candidate_tokens)
        .into_iter()
        .map(|region| {
            Edit::diff(
                EditType::from_kind(region.kind),
                Span::new(region.source_start, region.source_end, region.source_text),
                region
                    .replacement_text
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            )
        })
        .collect();

    let hits = if input.guardrails_enabled {
        find_text_hits(&source, ctx.rules)
    } else {
        Vec::new()
    };
    let rule_edits = synthesize_edits(&hits);

    let reconciled = reconcile(rule_edits, diff_edits, &hits, SymbolDomain::Word);
    let policy = apply_policy(&source.tokens, &reconciled);
    let categories = ctx.categorizer.categorize(&policy.edits);
    let final_text = policy.tokens.join(" ");

    let applied_edits = policy.applied().count();
    tracing::debug!(
        hits = hits.len(),
        edits = policy.edits.len(),
        applied = applied_edits,
        conflicts = reconciled.rule_overlaps.len(),
        "grammar analysis"
    );

    let review = hits
        .iter()
        .filter(|hit| hit.policy == Policy::Review)
        .cloned()
        .collect();
    let edits = if input.return_edits {
        policy.edits
    } else {
        Vec::new()
    };

    GrammarAnalysis {
        input: input.text.clone(),
        gec: GrammarCorrection {
            raw_corrected: candidate.to_string(),
            edits,
            applied_edits,
            final_text,
        },
        guardrails: hits,
        review,
        conflicts: reconciled.rule_overlaps,
        categories,
        metrics: GrammarMetrics { latency_ms: 0 },
    }
}
