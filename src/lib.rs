pub mod alignment;
pub mod analysis;
pub mod config;
pub mod error;
pub mod guardrails;
pub mod pipeline;
pub mod summary;
pub mod types;
pub mod weakness;

pub use config::{EngineConfig, RuleLoadPolicy};
pub use error::EngineError;
pub use pipeline::builder::EngineBuilder;
pub use pipeline::runtime::GuardrailEngine;
pub use pipeline::traits::{
    GrammarCategorizer, GrammarCorrector, GraphemeToPhoneme, SequenceAligner,
};
pub use summary::{summarize, WeaknessSummary};
pub use types::{
    AppliedEdit, Edit, EditKind, EditOp, EditOutcome, EditType, GrammarAnalysis, GrammarInput,
    PhonemeAnalysis, PhonemeInput, Policy, ReferenceInput, RuleHit, Span, Symbol,
};
pub use weakness::WeaknessTable;
