pub mod matcher;
pub mod policy;
pub mod reconcile;
pub mod rules;
pub mod synthesis;
