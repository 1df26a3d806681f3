pub mod grammar;
pub mod phoneme;
