pub mod ctc;
pub mod levenshtein;
pub mod normalize;
pub mod tokenization;
pub mod word_mapping;
