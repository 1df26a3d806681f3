use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::alignment::word_mapping::{word_for_op, WordPhoneRange};
use crate::config::{load_json_file, WeaknessEntry, WeaknessFile};
use crate::error::EngineError;
use crate::types::{AppliedEdit, EditKind, EditOp, WordAnalysis};

/// (expected, observed, category)
const BUILTIN_SUBSTITUTIONS: [(&str, &str, &str); 24] = [
    ("TH", "T", "th_vs_t"),
    ("DH", "D", "th_vs_t"),
    ("TH", "S", "th_vs_s"),
    ("DH", "Z", "th_vs_s"),
    ("TH", "F", "th_vs_f"),
    ("DH", "V", "th_vs_f"),
    ("V", "W", "v_vs_w"),
    ("W", "V", "v_vs_w"),
    ("V", "B", "v_vs_b"),
    ("B", "V", "v_vs_b"),
    ("F", "P", "f_vs_p"),
    ("P", "F", "f_vs_p"),
    ("Z", "S", "z_vs_s"),
    ("S", "Z", "z_vs_s"),
    ("SH", "S", "sh_vs_s"),
    ("S", "SH", "sh_vs_s"),
    ("CH", "SH", "ch_vs_sh"),
    ("SH", "CH", "ch_vs_sh"),
    ("L", "R", "l_vs_r"),
    ("R", "L", "l_vs_r"),
    ("IY", "IH", "ee_vs_i"),
    ("IH", "IY", "ee_vs_i"),
    ("UW", "UH", "oo_vs_u"),
    ("AE", "EH", "a_vs_e"),
];

/// Substitution-pair lookup into the weakness taxonomy. Keys are uppercase.
#[derive(Debug, Clone, Default)]
pub struct WeaknessTable {
    pairs: HashMap<(String, String), String>,
}

impl WeaknessTable {
    pub fn builtin() -> Self {
        Self::from_pairs(
            BUILTIN_SUBSTITUTIONS
                .iter()
                .map(|&(e, o, c)| (e.to_string(), o.to_string(), c.to_string())),
        )
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let file: WeaknessFile =
            load_json_file(path, "read weakness table", "parse weakness table")?;
        Ok(Self::from_entries(file.substitutions))
    }

    pub fn from_entries(entries: Vec<WeaknessEntry>) -> Self {
        Self::from_pairs(
            entries
                .into_iter()
                .map(|entry| (entry.expected, entry.observed, entry.category)),
        )
    }

    fn from_pairs(pairs: impl Iterator<Item = (String, String, String)>) -> Self {
        let pairs = pairs
            .map(|(expected, observed, category)| {
                ((expected.to_uppercase(), observed.to_uppercase()), category)
            })
            .collect();
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn lookup(&self, expected: &str, observed: &str) -> Option<&str> {
        self.pairs
            .get(&(expected.to_uppercase(), observed.to_uppercase()))
            .map(String::as_str)
    }

    /// Category for a single-symbol substitution; other ops have none.
    pub fn categorize(&self, op: &EditOp) -> Option<&str> {
        match (op.kind, op.expected.as_deref(), op.observed.as_deref()) {
            (EditKind::Substitute, Some(expected), Some(observed)) => {
                self.lookup(expected, observed)
            }
            _ => None,
        }
    }
}

/// Stamps each phoneme edit with its category, suppressed ones included.
pub fn label_edits(edits: &mut [AppliedEdit], table: &WeaknessTable) {
    for applied in edits.iter_mut() {
        applied.weakness = applied
            .edit
            .op
            .as_ref()
            .and_then(|op| table.categorize(op))
            .map(str::to_string);
    }
}

/// Sorted, deduplicated categories of the applied edits.
pub fn collect_categories<'a>(edits: impl IntoIterator<Item = &'a AppliedEdit>) -> Vec<String> {
    edits
        .into_iter()
        .filter(|e| e.outcome.is_applied())
        .filter_map(|e| e.weakness.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Per-word view of the applied phoneme edits.
pub fn word_breakdown(ranges: &[WordPhoneRange], edits: &[AppliedEdit]) -> Vec<WordAnalysis> {
    let mut per_word: Vec<Vec<&AppliedEdit>> = vec![Vec::new(); ranges.len()];
    for applied in edits.iter().filter(|e| e.outcome.is_applied()) {
        let Some(op) = applied.edit.op.as_ref() else {
            continue;
        };
        match word_for_op(ranges, op) {
            Some(idx) => per_word[idx].push(applied),
            None => tracing::debug!(
                expected_index = op.expected_index,
                "phoneme error outside every word range"
            ),
        }
    }

    ranges
        .iter()
        .zip(per_word)
        .map(|(range, word_edits)| WordAnalysis {
            word: range.word.clone(),
            is_correct: word_edits.is_empty(),
            phoneme_errors: word_edits.iter().filter_map(|e| e.edit.op.clone()).collect(),
            categories: collect_categories(word_edits.iter().copied()),
            mapping: range.quality,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edit, EditOutcome, EditType, Span, WordMappingQuality};

    fn applied(op: EditOp, outcome: EditOutcome) -> AppliedEdit {
        let (start, end) = op.expected_range();
        let edit = Edit::diff(
            EditType::from_kind(op.kind),
            Span::new(start, end, op.expected.clone().unwrap_or_default()),
            op.observed.iter().cloned().collect(),
        )
        .with_op(op);
        AppliedEdit {
            edit,
            outcome,
            weakness: None,
        }
    }

    fn range(word: &str, start: usize, end: usize) -> WordPhoneRange {
        WordPhoneRange {
            word: word.to_string(),
            start,
            end,
            quality: WordMappingQuality::Exact,
        }
    }

    #[test]
    fn builtin_table_knows_th_stopping() {
        let table = WeaknessTable::builtin();
        assert_eq!(table.lookup("DH", "D"), Some("th_vs_t"));
        assert_eq!(table.lookup("th", "t"), Some("th_vs_t"));
        assert_eq!(table.lookup("K", "G"), None);
        assert_eq!(table.len(), BUILTIN_SUBSTITUTIONS.len());
    }

    #[test]
    fn only_substitutions_are_categorized() {
        let table = WeaknessTable::builtin();
        assert_eq!(
            table.categorize(&EditOp::substitute("V", "W", 0, 0)),
            Some("v_vs_w")
        );
        assert_eq!(table.categorize(&EditOp::delete("TH", 0, 0)), None);
        assert_eq!(table.categorize(&EditOp::insert("T", 0, 0)), None);
    }

    #[test]
    fn suppressed_edits_are_labelled_but_not_counted() {
        let table = WeaknessTable::builtin();
        let mut edits = vec![
            applied(EditOp::substitute("DH", "D", 0, 0), EditOutcome::ForceBlocked),
            applied(EditOp::substitute("V", "W", 3, 3), EditOutcome::DefaultApplied),
            applied(EditOp::substitute("L", "R", 5, 5), EditOutcome::DefaultApplied),
            applied(EditOp::substitute("W", "V", 7, 7), EditOutcome::DefaultApplied),
        ];
        label_edits(&mut edits, &table);
        assert_eq!(edits[0].weakness.as_deref(), Some("th_vs_t"));
        assert_eq!(collect_categories(&edits), vec!["l_vs_r", "v_vs_w"]);
    }

    #[test]
    fn table_from_file_entries() {
        let table = WeaknessTable::from_entries(vec![WeaknessEntry {
            expected: "r".into(),
            observed: "l".into(),
            category: "liquids".into(),
        }]);
        assert_eq!(table.lookup("R", "L"), Some("liquids"));
        assert_eq!(table.lookup("DH", "D"), None);
    }

    #[test]
    fn load_reads_substitutions() {
        let path = std::env::temp_dir().join("guardrail_align_weakness_table.json");
        std::fs::write(
            &path,
            r#"{"substitutions": [{"expected": "Z", "observed": "JH", "category": "z_vs_j"}]}"#,
        )
        .expect("write table");
        let table = WeaknessTable::load(&path).expect("load table");
        assert_eq!(table.lookup("Z", "JH"), Some("z_vs_j"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn word_breakdown_counts_applied_edits_only() {
        let table = WeaknessTable::builtin();
        let ranges = vec![range("this", 0, 3), range("very", 3, 7)];
        let mut edits = vec![
            applied(EditOp::substitute("DH", "D", 0, 0), EditOutcome::ForceBlocked),
            applied(EditOp::substitute("V", "W", 3, 3), EditOutcome::DefaultApplied),
            applied(EditOp::insert("AH", 7, 7), EditOutcome::DefaultApplied),
        ];
        label_edits(&mut edits, &table);
        let words = word_breakdown(&ranges, &edits);
        assert!(words[0].is_correct);
        assert!(words[0].categories.is_empty());
        assert!(!words[1].is_correct);
        assert_eq!(words[1].phoneme_errors.len(), 2);
        assert_eq!(words[1].categories, vec!["v_vs_w"]);
    }
}
