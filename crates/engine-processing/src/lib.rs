pub mod batcher;
pub mod committer;
pub mod error;
pub mod keys;
pub mod retry;
pub mod validation;
