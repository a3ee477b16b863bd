pub mod blob;
pub mod error;
pub mod file;
pub mod queue;
pub mod table;
