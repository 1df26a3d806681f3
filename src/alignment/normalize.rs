use unicode_normalization::UnicodeNormalization;

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];
const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];
const SCALES: [&str; 7] = [
    "",
    "thousand",
    "million",
    "billion",
    "trillion",
    "quadrillion",
    "quintillion",
];

/// Normalizes reference text before grapheme-to-phoneme conversion.
///
/// ASCII-folds, lowercases, spells out digit runs, keeps only `a-z`, apostrophes
/// and single spaces.
pub fn normalize_reference_text(text: &str) -> String {
    let folded = fold_to_ascii(text).to_lowercase();

    let mut spelled = String::with_capacity(folded.len());
    let mut digits = String::new();
    for c in folded.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if !digits.is_empty() {
            spelled.push(' ');
            spelled.push_str(&spell_digits(&digits));
            spelled.push(' ');
            digits.clear();
        }
        spelled.push(c);
    }
    if !digits.is_empty() {
        spelled.push(' ');
        spelled.push_str(&spell_digits(&digits));
    }

    spelled
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compatibility-decomposes and drops what has no ASCII form.
fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkd() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => out.push('\''),
            'ß' => out.push_str("ss"),
            'æ' | 'Æ' => out.push_str("ae"),
            'œ' | 'Œ' => out.push_str("oe"),
            'ø' | 'Ø' => out.push('o'),
            'đ' | 'Đ' => out.push('d'),
            'ł' | 'Ł' => out.push('l'),
            'þ' | 'Þ' => out.push_str("th"),
            c if c.is_whitespace() => out.push(' '),
            _ => {}
        }
    }
    out
}

fn spell_digits(digits: &str) -> String {
    match digits.parse::<u64>() {
        Ok(value) => number_to_words(value).replace('-', " "),
        // Too long for u64: read digit by digit.
        Err(_) => digits
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| ONES[d as usize])
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// English cardinal, e.g. `123` -> `one hundred and twenty-three`.
pub fn number_to_words(value: u64) -> String {
    if value == 0 {
        return ONES[0].to_string();
    }

    let mut groups = Vec::new();
    let mut rest = value;
    while rest > 0 {
        groups.push((rest % 1000) as usize);
        rest /= 1000;
    }

    let mut parts: Vec<String> = Vec::new();
    for (scale, &group) in groups.iter().enumerate().rev() {
        if group == 0 {
            continue;
        }
        let words = if scale == 0 && groups.len() > 1 && group < 100 {
            format!("and {}", below_hundred(group))
        } else {
            below_thousand(group)
        };
        if SCALES[scale].is_empty() {
            parts.push(words);
        } else {
            parts.push(format!("{words} {}", SCALES[scale]));
        }
    }
    parts.join(" ")
}

fn below_thousand(n: usize) -> String {
    let hundreds = n / 100;
    let rest = n % 100;
    match (hundreds, rest) {
        (0, _) => below_hundred(rest),
        (h, 0) => format!("{} hundred", ONES[h]),
        (h, r) => format!("{} hundred and {}", ONES[h], below_hundred(r)),
    }
}

fn below_hundred(n: usize) -> String {
    if n < 20 {
        return ONES[n].to_string();
    }
    let tens = TENS[n / 10];
    match n % 10 {
        0 => tens.to_string(),
        ones => format!("{tens}-{}", ONES[ones]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_numbers() {
        assert_eq!(number_to_words(0), "zero");
        assert_eq!(number_to_words(7), "seven");
        assert_eq!(number_to_words(15), "fifteen");
        assert_eq!(number_to_words(40), "forty");
        assert_eq!(number_to_words(42), "forty-two");
    }

    #[test]
    fn hundreds_and_thousands() {
        assert_eq!(number_to_words(100), "one hundred");
        assert_eq!(number_to_words(123), "one hundred and twenty-three");
        assert_eq!(number_to_words(1005), "one thousand and five");
        assert_eq!(
            number_to_words(2_019),
            "two thousand and nineteen"
        );
        assert_eq!(
            number_to_words(3_000_250),
            "three million two hundred and fifty"
        );
    }

    #[test]
    fn normalizes_case_punctuation_and_digits() {
        assert_eq!(
            normalize_reference_text("I have 23 Cats!"),
            "i have twenty three cats"
        );
        assert_eq!(normalize_reference_text("  It's   fine. "), "it's fine");
    }

    #[test]
    fn folds_accents_and_curly_quotes() {
        assert_eq!(normalize_reference_text("Café naïve"), "cafe naive");
        assert_eq!(normalize_reference_text("isn\u{2019}t it"), "isn't it");
        assert_eq!(normalize_reference_text("Straße"), "strasse");
    }

    #[test]
    fn digits_glued_to_letters_are_split() {
        assert_eq!(normalize_reference_text("room7b"), "room seven b");
    }

    #[test]
    fn overlong_digit_runs_are_read_digit_by_digit() {
        let text = "1".repeat(25);
        let normalized = normalize_reference_text(&text);
        assert_eq!(normalized.split(' ').count(), 25);
        assert!(normalized.split(' ').all(|w| w == "one"));
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize_reference_text(""), "");
        assert_eq!(normalize_reference_text("!!!"), "");
    }
}
