use crate::types::{EditKind, EditOp};

/// One step of a full alignment path, matches included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Match { expected: usize, observed: usize },
    Substitute { expected: usize, observed: usize },
    Delete { expected: usize, observed: usize },
    Insert { expected: usize, observed: usize },
}

/// A maximal run of non-matching tokens between a source and a candidate text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRegion {
    pub kind: EditKind,
    pub source_start: usize,
    pub source_end: usize,
    pub candidate_start: usize,
    pub candidate_end: usize,
    pub source_text: String,
    pub replacement_text: String,
}

/// Unit-cost edit distance, two rolling rows.
pub fn edit_distance<S: AsRef<str>>(a: &[S], b: &[S]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, sa) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sb) in b.iter().enumerate() {
            let cost = usize::from(sa.as_ref() != sb.as_ref());
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Minimum-cost edit ops turning `expected` into `observed`, ordered by expected index.
///
/// Ties on the backtrace prefer the diagonal, then deletion, then insertion, so
/// identical inputs always produce the same script.
pub fn align<S: AsRef<str>>(expected: &[S], observed: &[S]) -> Vec<EditOp> {
    alignment_path(expected, observed)
        .into_iter()
        .filter_map(|step| match step {
            Step::Match { .. } => None,
            Step::Substitute { expected: i, observed: j } => Some(EditOp::substitute(
                expected[i].as_ref(),
                observed[j].as_ref(),
                i,
                j,
            )),
            Step::Delete { expected: i, observed: j } => {
                Some(EditOp::delete(expected[i].as_ref(), i, j))
            }
            Step::Insert { expected: i, observed: j } => {
                Some(EditOp::insert(observed[j].as_ref(), i, j))
            }
        })
        .collect()
}

/// Word-level diff that groups adjacent changes into regions with their literal text.
pub fn diff_tokens<S: AsRef<str>>(source: &[S], candidate: &[S]) -> Vec<DiffRegion> {
    let mut regions = Vec::new();
    let mut open: Option<RegionBuilder> = None;

    for step in alignment_path(source, candidate) {
        let (start, end, kind) = match step {
            Step::Match { .. } => {
                if let Some(builder) = open.take() {
                    regions.push(builder.finish(source, candidate));
                }
                continue;
            }
            Step::Substitute { expected: i, observed: j } => {
                ((i, j), (i + 1, j + 1), EditKind::Substitute)
            }
            Step::Delete { expected: i, observed: j } => ((i, j), (i + 1, j), EditKind::Delete),
            Step::Insert { expected: i, observed: j } => ((i, j), (i, j + 1), EditKind::Insert),
        };
        match open.as_mut() {
            Some(builder) => builder.extend(end, kind),
            None => open = Some(RegionBuilder::new(start, end, kind)),
        }
    }
    if let Some(builder) = open.take() {
        regions.push(builder.finish(source, candidate));
    }
    regions
}

struct RegionBuilder {
    start: (usize, usize),
    end: (usize, usize),
    has_delete: bool,
    has_insert: bool,
    has_substitute: bool,
}

impl RegionBuilder {
    fn new(start: (usize, usize), end: (usize, usize), kind: EditKind) -> Self {
        let mut builder = Self {
            start,
            end,
            has_delete: false,
            has_insert: false,
            has_substitute: false,
        };
        builder.mark(kind);
        builder
    }

    fn extend(&mut self, end: (usize, usize), kind: EditKind) {
        self.end = end;
        self.mark(kind);
    }

    fn mark(&mut self, kind: EditKind) {
        match kind {
            EditKind::Substitute => self.has_substitute = true,
            EditKind::Delete => self.has_delete = true,
            EditKind::Insert => self.has_insert = true,
        }
    }

    fn finish<S: AsRef<str>>(self, source: &[S], candidate: &[S]) -> DiffRegion {
        let kind = match (self.has_substitute, self.has_delete, self.has_insert) {
            (false, true, false) => EditKind::Delete,
            (false, false, true) => EditKind::Insert,
            _ => EditKind::Substitute,
        };
        DiffRegion {
            kind,
            source_start: self.start.0,
            source_end: self.end.0,
            candidate_start: self.start.1,
            candidate_end: self.end.1,
            source_text: join(&source[self.start.0..self.end.0]),
            replacement_text: join(&candidate[self.start.1..self.end.1]),
        }
    }
}

fn join<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn alignment_path<S: AsRef<str>>(expected: &[S], observed: &[S]) -> Vec<Step> {
    let n = expected.len();
    let m = observed.len();
    let width = m + 1;
    let mut dist = vec![0u32; (n + 1) * width];
    for j in 0..=m {
        dist[j] = j as u32;
    }
    for i in 1..=n {
        let row = i * width;
        dist[row] = i as u32;
        for j in 1..=m {
            let cost = u32::from(expected[i - 1].as_ref() != observed[j - 1].as_ref());
            let diag = dist[row - width + j - 1] + cost;
            let up = dist[row - width + j] + 1;
            let left = dist[row + j - 1] + 1;
            dist[row + j] = diag.min(up).min(left);
        }
    }

    let mut steps = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let here = dist[i * width + j];
        if i > 0 && j > 0 {
            let same = expected[i - 1].as_ref() == observed[j - 1].as_ref();
            let diag = dist[(i - 1) * width + j - 1] + u32::from(!same);
            if here == diag {
                steps.push(if same {
                    Step::Match { expected: i - 1, observed: j - 1 }
                } else {
                    Step::Substitute { expected: i - 1, observed: j - 1 }
                });
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && here == dist[(i - 1) * width + j] + 1 {
            steps.push(Step::Delete { expected: i - 1, observed: j });
            i -= 1;
            continue;
        }
        debug_assert!(j > 0, "backtrace left the table");
        steps.push(Step::Insert { expected: i, observed: j - 1 });
        j -= 1;
    }
    steps.reverse();
    steps
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const PHONES: [&str; 6] = ["AA", "B", "DH", "D", "IH", "S"];

    fn random_sequence(rng: &mut StdRng, max_len: usize) -> Vec<String> {
        let len = rng.gen_range(0..=max_len);
        (0..len)
            .map(|_| PHONES[rng.gen_range(0..PHONES.len())].to_string())
            .collect()
    }

    /// Rebuilds `observed` from `expected` and an op list.
    fn replay(expected: &[String], ops: &[EditOp]) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = 0usize;
        for op in ops {
            let (start, end) = op.expected_range();
            out.extend_from_slice(&expected[cursor..start]);
            if let Some(observed) = &op.observed {
                out.push(observed.clone());
            }
            cursor = end;
        }
        out.extend_from_slice(&expected[cursor..]);
        out
    }

    #[test]
    fn single_substitution() {
        let ops = align(&["DH", "IH", "S"], &["D", "IH", "S"]);
        assert_eq!(ops, vec![EditOp::substitute("DH", "D", 0, 0)]);
    }

    #[test]
    fn identical_sequences_yield_no_ops() {
        let seq = ["HH", "AH", "L", "OW"];
        assert!(align(&seq, &seq).is_empty());
    }

    #[test]
    fn empty_reference_is_all_inserts() {
        let empty: [&str; 0] = [];
        let ops = align(&empty, &["A", "B"]);
        assert_eq!(
            ops,
            vec![EditOp::insert("A", 0, 0), EditOp::insert("B", 0, 1)]
        );
    }

    #[test]
    fn empty_observed_is_all_deletes() {
        let empty: [&str; 0] = [];
        let ops = align(&["A", "B"], &empty);
        assert_eq!(
            ops,
            vec![EditOp::delete("A", 0, 0), EditOp::delete("B", 1, 0)]
        );
    }

    #[test]
    fn both_empty() {
        let empty: [&str; 0] = [];
        assert!(align(&empty, &empty).is_empty());
        assert!(diff_tokens(&empty, &empty).is_empty());
    }

    #[test]
    fn deletion_and_insertion_indices() {
        let ops = align(&["K", "AE", "T"], &["K", "T"]);
        assert_eq!(ops, vec![EditOp::delete("AE", 1, 1)]);

        let ops = align(&["K", "T"], &["K", "T", "S"]);
        assert_eq!(ops, vec![EditOp::insert("S", 2, 2)]);

        // Equal-cost scripts resolve towards substitutions.
        let ops = align(&["K", "AE", "T"], &["K", "T", "S"]);
        assert_eq!(
            ops,
            vec![
                EditOp::substitute("AE", "T", 1, 1),
                EditOp::substitute("T", "S", 2, 2)
            ]
        );
    }

    #[test]
    fn op_count_matches_edit_distance_on_random_inputs() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let a = random_sequence(&mut rng, 12);
            let b = random_sequence(&mut rng, 12);
            let ops = align(&a, &b);
            assert_eq!(ops.len(), edit_distance(&a, &b), "a={a:?} b={b:?}");
            assert!(align(&a, &a).is_empty());
        }
    }

    #[test]
    fn ops_replay_to_observed_and_are_ordered() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..300 {
            let a = random_sequence(&mut rng, 10);
            let b = random_sequence(&mut rng, 10);
            let ops = align(&a, &b);
            assert_eq!(replay(&a, &ops), b, "a={a:?} b={b:?} ops={ops:?}");
            for pair in ops.windows(2) {
                assert!(pair[0].expected_index <= pair[1].expected_index);
                assert!(pair[0].observed_index <= pair[1].observed_index);
            }
        }
    }

    #[test]
    fn alignment_is_stable_across_calls() {
        let a = ["AA", "B", "AA", "B"];
        let b = ["B", "AA", "B", "AA"];
        let first = align(&a, &b);
        for _ in 0..10 {
            assert_eq!(align(&a, &b), first);
        }
    }

    #[test]
    fn token_diff_single_substitution_region() {
        let regions = diff_tokens(&["She", "go", "home"], &["She", "goes", "home"]);
        assert_eq!(
            regions,
            vec![DiffRegion {
                kind: EditKind::Substitute,
                source_start: 1,
                source_end: 2,
                candidate_start: 1,
                candidate_end: 2,
                source_text: "go".into(),
                replacement_text: "goes".into(),
            }]
        );
    }

    #[test]
    fn token_diff_merges_adjacent_changes() {
        let regions = diff_tokens(
            &["I", "discussed", "about", "it"],
            &["I", "discussed", "it"],
        );
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, EditKind::Delete);
        assert_eq!((regions[0].source_start, regions[0].source_end), (2, 3));
        assert_eq!(regions[0].source_text, "about");
        assert_eq!(regions[0].replacement_text, "");

        let regions = diff_tokens(&["a", "b", "c"], &["x", "y", "c", "d"]);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].source_text, "a b");
        assert_eq!(regions[0].replacement_text, "x y");
        assert_eq!(regions[1].kind, EditKind::Insert);
        assert_eq!((regions[1].source_start, regions[1].source_end), (3, 3));
        assert_eq!(regions[1].replacement_text, "d");
    }
}
