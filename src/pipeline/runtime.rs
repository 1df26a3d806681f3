use std::time::Instant;

use crate::alignment::ctc::{decode_log_probs, PhonemeVocab};
use crate::analysis::grammar::{analyze_grammar, GrammarContext};
use crate::analysis::phoneme::{analyze_phonemes, PhonemeContext};
use crate::error::EngineError;
use crate::guardrails::rules::{PhonemeRuleTable, TextRuleTable};
use crate::pipeline::traits::{
    GrammarCategorizer, GrammarCorrector, GraphemeToPhoneme, SequenceAligner,
};
use crate::types::{
    GrammarAnalysis, GrammarInput, PhonemeAnalysis, PhonemeInput, ReferenceInput, Symbol,
};
use crate::weakness::WeaknessTable;

/// Immutable engine context. Build once, share across threads.
pub struct GuardrailEngine {
    phoneme_rules: PhonemeRuleTable,
    grammar_rules: TextRuleTable,
    weakness_table: WeaknessTable,
    phoneme_vocab: Option<PhonemeVocab>,
    sequence_aligner: Box<dyn SequenceAligner>,
    phonemizer: Option<Box<dyn GraphemeToPhoneme>>,
    grammar_corrector: Box<dyn GrammarCorrector>,
    grammar_categorizer: Box<dyn GrammarCategorizer>,
}

pub(crate) struct GuardrailEngineParts {
    pub phoneme_rules: PhonemeRuleTable,
    pub grammar_rules: TextRuleTable,
    pub weakness_table: WeaknessTable,
    pub phoneme_vocab: Option<PhonemeVocab>,
    pub sequence_aligner: Box<dyn SequenceAligner>,
    pub phonemizer: Option<Box<dyn GraphemeToPhoneme>>,
    pub grammar_corrector: Box<dyn GrammarCorrector>,
    pub grammar_categorizer: Box<dyn GrammarCategorizer>,
}

impl GuardrailEngine {
    pub(crate) fn from_parts(parts: GuardrailEngineParts) -> Self {
        Self {
            phoneme_rules: parts.phoneme_rules,
            grammar_rules: parts.grammar_rules,
            weakness_table: parts.weakness_table,
            phoneme_vocab: parts.phoneme_vocab,
            sequence_aligner: parts.sequence_aligner,
            phonemizer: parts.phonemizer,
            grammar_corrector: parts.grammar_corrector,
            grammar_categorizer: parts.grammar_categorizer,
        }
    }

    pub fn analyze_phonemes(&self, input: &PhonemeInput) -> Result<PhonemeAnalysis, EngineError> {
        let observed = self.observed_phones(input)?;
        let reference = self.reference(input)?;
        let ctx = PhonemeContext {
            aligner: self.sequence_aligner.as_ref(),
            rules: &self.phoneme_rules,
            weakness: &self.weakness_table,
        };
        analyze_phonemes(observed, reference, &ctx)
    }

    pub fn correct_text(&self, input: &GrammarInput) -> Result<GrammarAnalysis, EngineError> {
        let started = Instant::now();
        let candidate = match &input.candidate {
            Some(candidate) => candidate.clone(),
            None => self.grammar_corrector.correct(&input.text)?,
        };
        let ctx = GrammarContext {
            aligner: self.sequence_aligner.as_ref(),
            rules: &self.grammar_rules,
            categorizer: self.grammar_categorizer.as_ref(),
        };
        let mut analysis = analyze_grammar(input, &candidate, &ctx);
        analysis.metrics.latency_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(analysis)
    }

    pub fn phoneme_rules(&self) -> &PhonemeRuleTable {
        &self.phoneme_rules
    }

    pub fn grammar_rules(&self) -> &TextRuleTable {
        &self.grammar_rules
    }

    pub fn weakness_table(&self) -> &WeaknessTable {
        &self.weakness_table
    }

    pub fn phoneme_vocab(&self) -> Option<&PhonemeVocab> {
        self.phoneme_vocab.as_ref()
    }

    fn observed_phones(&self, input: &PhonemeInput) -> Result<Vec<Symbol>, EngineError> {
        match (&input.observed, &input.frame_log_probs) {
            (Some(observed), _) => Ok(observed.clone()),
            (None, Some(log_probs)) => {
                let vocab = self.phoneme_vocab.as_ref().ok_or_else(|| {
                    EngineError::invalid_input(
                        "frame log-probabilities given but no phoneme vocab is configured",
                    )
                })?;
                if let Some(row) = log_probs.iter().find(|row| row.len() != vocab.len()) {
                    tracing::warn!(
                        frame_width = row.len(),
                        vocab_size = vocab.len(),
                        "frame width differs from vocab size; out-of-vocab ids are skipped"
                    );
                }
                Ok(decode_log_probs(log_probs, vocab))
            }
            (None, None) => Err(EngineError::invalid_input(
                "either observed phones or frame log-probabilities are required",
            )),
        }
    }

    fn reference(&self, input: &PhonemeInput) -> Result<Option<ReferenceInput>, EngineError> {
        match (&input.reference, &input.reference_text) {
            (Some(reference), _) => Ok(Some(reference.clone())),
            (None, Some(text)) => {
                let phonemizer = self.phonemizer.as_ref().ok_or_else(|| {
                    EngineError::invalid_input(
                        "reference text given but no grapheme-to-phoneme collaborator is set",
                    )
                })?;
                phonemizer.phonemize(text).map(Some)
            }
            (None, None) => Ok(None),
        }
    }
}
