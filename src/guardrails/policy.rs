use crate::guardrails::reconcile::Reconciled;
use crate::types::{AppliedEdit, Edit, EditOrigin, EditOutcome, Policy, Symbol};

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyResult {
    /// Every reconciled edit with its outcome, in reconciled order.
    pub edits: Vec<AppliedEdit>,
    /// Source with the applied edits spliced in.
    pub tokens: Vec<Symbol>,
}

impl PolicyResult {
    pub fn applied(&self) -> impl Iterator<Item = &AppliedEdit> {
        self.edits.iter().filter(|e| e.outcome.is_applied())
    }
}

/// Decides each edit's outcome and builds the final sequence.
///
/// Edits are visited in reconciled order, which is precedence order; an allowed
/// edit conflicting with one already accepted is superseded.
pub fn apply_policy(source: &[Symbol], reconciled: &Reconciled) -> PolicyResult {
    let mut accepted: Vec<&Edit> = Vec::new();
    let mut edits = Vec::with_capacity(reconciled.edits.len());

    for edit in &reconciled.edits {
        let outcome = if is_blocked(edit, reconciled) {
            EditOutcome::ForceBlocked
        } else if accepted.iter().any(|a| a.conflicts_with(edit)) {
            tracing::debug!(
                start = edit.span.start,
                end = edit.span.end,
                "edit superseded by a higher-precedence edit"
            );
            EditOutcome::Superseded
        } else {
            accepted.push(edit);
            match edit.origin {
                EditOrigin::RuleDerived => EditOutcome::ForceApplied,
                EditOrigin::Diff => EditOutcome::DefaultApplied,
            }
        };
        edits.push(AppliedEdit {
            edit: edit.clone(),
            outcome,
            weakness: None,
        });
    }

    let tokens = apply_edits(source, &accepted);
    PolicyResult { edits, tokens }
}

fn is_blocked(edit: &Edit, reconciled: &Reconciled) -> bool {
    edit.policy() == Some(Policy::Suppress)
        || reconciled
            .suppression_zones
            .iter()
            .any(|zone| zone.span.overlaps(&edit.span))
}

/// Builds a new sequence from `source` with non-conflicting `edits` spliced in.
///
/// Insertions sharing an anchor keep the order of their observed positions.
pub fn apply_edits(source: &[Symbol], edits: &[&Edit]) -> Vec<Symbol> {
    let mut ordered: Vec<&Edit> = edits.to_vec();
    ordered.sort_by_key(|e| {
        let observed_index = e.op.as_ref().map(|op| op.observed_index);
        (e.span.start, e.span.end, observed_index)
    });

    let mut out = Vec::with_capacity(source.len());
    let mut cursor = 0usize;
    for edit in ordered {
        let start = edit.span.start.clamp(cursor, source.len());
        let end = edit.span.end.clamp(start, source.len());
        out.extend_from_slice(&source[cursor..start]);
        out.extend(edit.replacement.iter().cloned());
        cursor = end;
    }
    out.extend_from_slice(&source[cursor..]);
    out
}
