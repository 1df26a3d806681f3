use crate::types::{Span, Symbol};

/// Whitespace-normalized text with the byte range of every token in `joined`.
///
/// Rule matching runs on `joined`, so match offsets and token offsets share one
/// coordinate system.
#[derive(Debug, Clone)]
pub struct TokenizedText {
    pub joined: String,
    pub tokens: Vec<Symbol>,
    offsets: Vec<(usize, usize)>,
}

impl TokenizedText {
    pub fn new(text: &str) -> Self {
        let tokens: Vec<Symbol> = text.split_whitespace().map(str::to_string).collect();
        Self::from_tokens(tokens)
    }

    pub fn from_tokens(tokens: Vec<Symbol>) -> Self {
        let mut joined = String::new();
        let mut offsets = Vec::with_capacity(tokens.len());
        for token in &tokens {
            if !joined.is_empty() {
                joined.push(' ');
            }
            let start = joined.len();
            joined.push_str(token);
            offsets.push((start, joined.len()));
        }
        debug_assert_eq!(
            joined,
            tokens.join(" "),
            "tokenization offset contract violated"
        );
        Self {
            joined,
            tokens,
            offsets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Token range covering the character match `[start_char, end_char)`.
    ///
    /// A match touching no token (pure whitespace) yields the empty span `[0, 0)`,
    /// which callers treat as a no-op.
    pub fn locate_span(&self, start_char: usize, end_char: usize) -> Span {
        let mut first: Option<usize> = None;
        let mut last = 0usize;
        for (idx, &(s, e)) in self.offsets.iter().enumerate() {
            if !(e <= start_char || end_char <= s) {
                first.get_or_insert(idx);
                last = idx;
            }
        }
        match first {
            Some(start) => Span::from_tokens(&self.tokens, start, last + 1),
            None => Span::empty(),
        }
    }
}

/// Free-standing form of [`TokenizedText::locate_span`] for callers that only hold tokens.
pub fn locate_span(tokens: &[Symbol], start_char: usize, end_char: usize) -> Span {
    TokenizedText::from_tokens(tokens.to_vec()).locate_span(start_char, end_char)
}

/// Rejects symbols that cannot have come out of an upstream tokenizer.
pub(crate) fn validate_symbols(symbols: &[Symbol], what: &str) -> Result<(), String> {
    for (idx, symbol) in symbols.iter().enumerate() {
        if symbol.is_empty() {
            return Err(format!("{what}[{idx}] is an empty symbol"));
        }
        if symbol.chars().any(char::is_whitespace) {
            return Err(format!("{what}[{idx}] contains whitespace: {symbol:?}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<Symbol> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn collapses_whitespace() {
        let text = TokenizedText::new("  She   go\thome ");
        assert_eq!(text.joined, "She go home");
        assert_eq!(text.tokens, toks(&["She", "go", "home"]));
    }

    #[test]
    fn span_covering_two_tokens() {
        let text = TokenizedText::new("we discussed about homework");
        // "discussed about" spans bytes 3..18
        let span = text.locate_span(3, 18);
        assert_eq!((span.start, span.end), (1, 3));
        assert_eq!(span.text, "discussed about");
    }

    #[test]
    fn partial_token_overlap_expands_to_whole_token() {
        let text = TokenizedText::new("three-wheeler ride");
        let span = text.locate_span(6, 10);
        assert_eq!((span.start, span.end), (0, 1));
        assert_eq!(span.text, "three-wheeler");
    }

    #[test]
    fn whitespace_only_match_is_empty_span() {
        let text = TokenizedText::new("a b");
        let span = text.locate_span(1, 2);
        assert!(span.is_empty());
        assert_eq!(span.start, 0);
        assert!(span.text.is_empty());
    }

    #[test]
    fn free_function_matches_method() {
        let tokens = toks(&["isn't", "it", "nice"]);
        let span = locate_span(&tokens, 0, 8);
        assert_eq!((span.start, span.end), (0, 2));
        assert_eq!(span.text, "isn't it");
    }

    #[test]
    fn validation_rejects_blank_and_spaced_symbols() {
        assert!(validate_symbols(&toks(&["AA", "B"]), "observed").is_ok());
        assert!(validate_symbols(&toks(&["AA", ""]), "observed").is_err());
        assert!(validate_symbols(&toks(&["A A"]), "observed").is_err());
    }
}
