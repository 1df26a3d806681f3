use std::collections::HashMap;
use std::path::Path;

use crate::config::load_json_file;
use crate::error::EngineError;
use crate::types::Symbol;

/// Symbols that mark structure rather than sound.
const PLACEHOLDER_SYMBOLS: [&str; 4] = ["<PAD>", "<S>", "</S>", "|"];
/// Blank candidates, in the order they are preferred.
const BLANK_CANDIDATES: [&str; 5] = ["<BLANK>", "<BLK>", "<PAD>", "<S>", "</S>"];

/// Id -> phoneme table of a CTC phoneme recognizer.
#[derive(Debug, Clone)]
pub struct PhonemeVocab {
    id_to_symbol: HashMap<usize, Symbol>,
    blank_id: usize,
}

impl PhonemeVocab {
    /// Loads a `{"symbol": id}` vocabulary file; symbols are uppercased.
    pub fn load(path: &Path, blank_id: Option<usize>) -> Result<Self, EngineError> {
        let raw: HashMap<String, usize> =
            load_json_file(path, "read phoneme vocab", "parse phoneme vocab")?;
        Ok(Self::from_symbol_ids(raw, blank_id))
    }

    pub fn from_symbol_ids(symbol_ids: HashMap<String, usize>, blank_id: Option<usize>) -> Self {
        let id_to_symbol: HashMap<usize, Symbol> = symbol_ids
            .into_iter()
            .map(|(symbol, id)| (id, symbol.to_uppercase()))
            .collect();
        let blank_id = blank_id.unwrap_or_else(|| infer_blank_id(&id_to_symbol));
        Self {
            id_to_symbol,
            blank_id,
        }
    }

    pub fn blank_id(&self) -> usize {
        self.blank_id
    }

    pub fn len(&self) -> usize {
        self.id_to_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_symbol.is_empty()
    }

    pub fn symbol(&self, id: usize) -> Option<&str> {
        self.id_to_symbol.get(&id).map(String::as_str)
    }
}

/// Picks a placeholder symbol as blank, falling back to id 0.
fn infer_blank_id(id_to_symbol: &HashMap<usize, Symbol>) -> usize {
    for candidate in BLANK_CANDIDATES {
        let mut ids: Vec<usize> = id_to_symbol
            .iter()
            .filter(|(_, symbol)| symbol.as_str() == candidate)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        if let Some(&id) = ids.first() {
            return id;
        }
    }
    0
}

/// Per-frame argmax over log-probabilities.
pub fn greedy_ids(log_probs: &[Vec<f32>]) -> Vec<usize> {
    log_probs
        .iter()
        .map(|row| {
            let mut best = 0usize;
            let mut best_lp = f32::NEG_INFINITY;
            for (id, &lp) in row.iter().enumerate() {
                if lp > best_lp {
                    best_lp = lp;
                    best = id;
                }
            }
            best
        })
        .collect()
}

/// Greedy CTC collapse: drops blanks, repeated ids and placeholder symbols.
pub fn collapse_greedy(ids: &[usize], vocab: &PhonemeVocab) -> Vec<Symbol> {
    let mut out = Vec::new();
    let mut prev: Option<usize> = None;
    for &id in ids {
        if id == vocab.blank_id || prev == Some(id) {
            prev = Some(id);
            continue;
        }
        prev = Some(id);
        match vocab.symbol(id) {
            Some(symbol) if PLACEHOLDER_SYMBOLS.contains(&symbol) => {}
            Some(symbol) => out.push(symbol.to_string()),
            None => tracing::debug!(id, "ctc: id missing from phoneme vocab, skipped"),
        }
    }
    out
}

pub fn decode_log_probs(log_probs: &[Vec<f32>], vocab: &PhonemeVocab) -> Vec<Symbol> {
    collapse_greedy(&greedy_ids(log_probs), vocab)
}
