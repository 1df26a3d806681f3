use crate::alignment::levenshtein::DiffRegion;
use crate::error::EngineError;
use crate::types::{AppliedEdit, EditOp, ReferenceInput, Symbol};

pub trait SequenceAligner: Send + Sync {
    fn align(&self, expected: &[Symbol], observed: &[Symbol]) -> Vec<EditOp>;

    fn diff_tokens(&self, source: &[Symbol], candidate: &[Symbol]) -> Vec<DiffRegion>;
}

/// Reference pronunciation generator.
pub trait GraphemeToPhoneme: Send + Sync {
    fn phonemize(&self, text: &str) -> Result<ReferenceInput, EngineError>;
}

/// Grammar correction model proposing a corrected candidate for a text.
pub trait GrammarCorrector: Send + Sync {
    fn correct(&self, text: &str) -> Result<String, EngineError>;
}

pub trait GrammarCategorizer: Send + Sync {
    fn categorize(&self, edits: &[AppliedEdit]) -> Vec<String>;
}
