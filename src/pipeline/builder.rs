use std::path::Path;

use crate::alignment::ctc::PhonemeVocab;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::guardrails::rules::{PhonemeRuleTable, TextRuleTable};
use crate::pipeline::defaults::{EditTypeCategorizer, LevenshteinAligner, PassthroughCorrector};
use crate::pipeline::runtime::{GuardrailEngine, GuardrailEngineParts};
use crate::pipeline::traits::{
    GrammarCategorizer, GrammarCorrector, GraphemeToPhoneme, SequenceAligner,
};
use crate::weakness::WeaknessTable;

pub struct EngineBuilder {
    config: EngineConfig,
    sequence_aligner: Option<Box<dyn SequenceAligner>>,
    phonemizer: Option<Box<dyn GraphemeToPhoneme>>,
    grammar_corrector: Option<Box<dyn GrammarCorrector>>,
    grammar_categorizer: Option<Box<dyn GrammarCategorizer>>,
    phoneme_rules: Option<PhonemeRuleTable>,
    grammar_rules: Option<TextRuleTable>,
    weakness_table: Option<WeaknessTable>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sequence_aligner: None,
            phonemizer: None,
            grammar_corrector: None,
            grammar_categorizer: None,
            phoneme_rules: None,
            grammar_rules: None,
            weakness_table: None,
        }
    }

    pub fn with_sequence_aligner(mut self, sequence_aligner: Box<dyn SequenceAligner>) -> Self {
        self.sequence_aligner = Some(sequence_aligner);
        self
    }

    pub fn with_phonemizer(mut self, phonemizer: Box<dyn GraphemeToPhoneme>) -> Self {
        self.phonemizer = Some(phonemizer);
        self
    }

    pub fn with_grammar_corrector(mut self, grammar_corrector: Box<dyn GrammarCorrector>) -> Self {
        self.grammar_corrector = Some(grammar_corrector);
        self
    }

    pub fn with_grammar_categorizer(
        mut self,
        grammar_categorizer: Box<dyn GrammarCategorizer>,
    ) -> Self {
        self.grammar_categorizer = Some(grammar_categorizer);
        self
    }

    /// Overrides `phoneme_rules_path`.
    pub fn with_phoneme_rules(mut self, rules: PhonemeRuleTable) -> Self {
        self.phoneme_rules = Some(rules);
        self
    }

    /// Overrides `grammar_rules_path` and the built-in grammar rules.
    pub fn with_grammar_rules(mut self, rules: TextRuleTable) -> Self {
        self.grammar_rules = Some(rules);
        self
    }

    pub fn with_weakness_table(mut self, table: WeaknessTable) -> Self {
        self.weakness_table = Some(table);
        self
    }

    pub fn build(self) -> Result<GuardrailEngine, EngineError> {
        let policy = self.config.rule_load_policy;

        let phoneme_rules = match (self.phoneme_rules, &self.config.phoneme_rules_path) {
            (Some(rules), _) => rules,
            (None, Some(path)) => PhonemeRuleTable::load(Path::new(path), policy)?,
            (None, None) => PhonemeRuleTable::default(),
        };

        let grammar_rules = match (self.grammar_rules, &self.config.grammar_rules_path) {
            (Some(rules), _) => rules,
            (None, Some(path)) => TextRuleTable::load(Path::new(path), policy)?,
            (None, None) if self.config.use_builtin_grammar_rules => TextRuleTable::builtin(),
            (None, None) => TextRuleTable::default(),
        };

        let weakness_table = match (self.weakness_table, &self.config.weakness_table_path) {
            (Some(table), _) => table,
            (None, Some(path)) => WeaknessTable::load(Path::new(path))?,
            (None, None) => WeaknessTable::builtin(),
        };

        let phoneme_vocab = self
            .config
            .phoneme_vocab_path
            .as_deref()
            .map(|path| PhonemeVocab::load(Path::new(path), self.config.blank_id))
            .transpose()?;

        tracing::debug!(
            phoneme_rules = phoneme_rules.len(),
            grammar_rules = grammar_rules.len(),
            weakness_pairs = weakness_table.len(),
            has_vocab = phoneme_vocab.is_some(),
            "guardrail engine built"
        );

        Ok(GuardrailEngine::from_parts(GuardrailEngineParts {
            phoneme_rules,
            grammar_rules,
            weakness_table,
            phoneme_vocab,
            sequence_aligner: self
                .sequence_aligner
                .unwrap_or_else(|| Box::new(LevenshteinAligner)),
            phonemizer: self.phonemizer,
            grammar_corrector: self
                .grammar_corrector
                .unwrap_or_else(|| Box::new(PassthroughCorrector)),
            grammar_categorizer: self
                .grammar_categorizer
                .unwrap_or_else(|| Box::new(EditTypeCategorizer)),
        }))
    }
}
