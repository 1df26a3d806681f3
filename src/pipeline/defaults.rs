use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::alignment::levenshtein::{align, diff_tokens, DiffRegion};
use crate::alignment::normalize::normalize_reference_text;
use crate::config::load_json_file;
use crate::error::EngineError;
use crate::pipeline::traits::{
    GrammarCategorizer, GrammarCorrector, GraphemeToPhoneme, SequenceAligner,
};
use crate::types::{AppliedEdit, EditOp, EditType, ReferenceInput, ReferenceWord, Symbol};

const PLACEHOLDER_PHONES: [&str; 4] = ["<PAD>", "<S>", "</S>", "|"];

pub struct LevenshteinAligner;

impl SequenceAligner for LevenshteinAligner {
    fn align(&self, expected: &[Symbol], observed: &[Symbol]) -> Vec<EditOp> {
        align(expected, observed)
    }

    fn diff_tokens(&self, source: &[Symbol], candidate: &[Symbol]) -> Vec<DiffRegion> {
        diff_tokens(source, candidate)
    }
}

/// Stand-in when no correction model is wired: proposes the input unchanged.
pub struct PassthroughCorrector;

impl GrammarCorrector for PassthroughCorrector {
    fn correct(&self, text: &str) -> Result<String, EngineError> {
        Ok(text.to_string())
    }
}

/// Categories straight from the types of the applied edits.
pub struct EditTypeCategorizer;

impl GrammarCategorizer for EditTypeCategorizer {
    fn categorize(&self, edits: &[AppliedEdit]) -> Vec<String> {
        edits
            .iter()
            .filter(|e| e.outcome.is_applied())
            .map(|e| match &e.edit.edit_type {
                EditType::Rule(category) => category.to_lowercase(),
                EditType::Verbal => "verb".to_string(),
                EditType::Punctuation => "punctuation".to_string(),
                EditType::Orthographic => "orthography".to_string(),
                EditType::Substitute => "word_choice".to_string(),
                EditType::Insert => "missing_word".to_string(),
                EditType::Delete => "extra_word".to_string(),
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Dictionary-backed grapheme-to-phoneme lookup.
///
/// Stress digits are stripped and phones uppercased; a word missing from the
/// lexicon fails the whole lookup.
pub struct LexiconPhonemizer {
    lexicon: HashMap<String, Vec<Symbol>>,
}

impl LexiconPhonemizer {
    pub fn new(lexicon: HashMap<String, Vec<Symbol>>) -> Self {
        let lexicon = lexicon
            .into_iter()
            .map(|(word, phones)| (word.to_lowercase(), clean_phones(&phones)))
            .collect();
        Self { lexicon }
    }

    /// Loads a `{"word": ["PH", ...]}` file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw: HashMap<String, Vec<Symbol>> =
            load_json_file(path, "read pronunciation lexicon", "parse pronunciation lexicon")?;
        Ok(Self::new(raw))
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }
}

fn clean_phones(phones: &[Symbol]) -> Vec<Symbol> {
    phones
        .iter()
        .map(|p| {
            p.chars()
                .filter(|c| !c.is_ascii_digit())
                .collect::<String>()
                .to_uppercase()
        })
        .filter(|p| !p.is_empty() && !PLACEHOLDER_PHONES.contains(&p.as_str()))
        .collect()
}

impl GraphemeToPhoneme for LexiconPhonemizer {
    fn phonemize(&self, text: &str) -> Result<ReferenceInput, EngineError> {
        let normalized = normalize_reference_text(text);
        let words = normalized
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(|word| {
                self.lexicon
                    .get(word)
                    .map(|phones| ReferenceWord {
                        word: word.to_string(),
                        phones: phones.clone(),
                    })
                    .ok_or_else(|| {
                        EngineError::collaborator(
                            "pronunciation lexicon",
                            format!("no pronunciation for {word:?}"),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReferenceInput::from_words(text, words))
    }
}
