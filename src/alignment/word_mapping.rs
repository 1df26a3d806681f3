use crate::types::{EditKind, EditOp, ReferenceWord, Symbol, WordMappingQuality};

/// Reference phone index range `[start, end)` attributed to one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPhoneRange {
    pub word: String,
    pub start: usize,
    pub end: usize,
    pub quality: WordMappingQuality,
}

impl WordPhoneRange {
    fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// Attributes reference phone indices to words by consuming `phones` left to right.
///
/// Best effort only: a word whose own phones do not appear at the cursor (the flat
/// sequence was phonemized in context, or a word was dropped upstream) still
/// receives the next `len(word.phones)` indices, marked `Fallback`. Attribution of
/// errors to such words is approximate.
pub fn map_words_to_phones(words: &[ReferenceWord], phones: &[Symbol]) -> Vec<WordPhoneRange> {
    let mut cursor = 0usize;
    let mut ranges = Vec::with_capacity(words.len());
    for word in words {
        let len = word.phones.len();
        let end = (cursor + len).min(phones.len());
        let exact = cursor + len <= phones.len()
            && phones[cursor..cursor + len]
                .iter()
                .zip(word.phones.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b));
        let quality = if exact {
            WordMappingQuality::Exact
        } else {
            tracing::debug!(
                word = word.word.as_str(),
                cursor,
                expected_phones = len,
                "word mapping: phones mismatch, falling back to positional assignment"
            );
            WordMappingQuality::Fallback
        };
        ranges.push(WordPhoneRange {
            word: word.word.clone(),
            start: cursor,
            end,
            quality,
        });
        cursor = end;
    }
    ranges
}

/// Index of the word an op belongs to.
///
/// An insertion belongs to the word whose range holds its anchor, so one landing
/// between two words goes to the following word. Only an insertion past the last
/// phone falls back to the last non-empty word.
pub fn word_for_op(ranges: &[WordPhoneRange], op: &EditOp) -> Option<usize> {
    let index = op.expected_index;
    if let Some(found) = ranges.iter().position(|r| r.contains(index)) {
        return Some(found);
    }
    if op.kind == EditKind::Insert {
        return ranges
            .iter()
            .rposition(|r| r.end == index && r.end > r.start);
    }
    None
}
