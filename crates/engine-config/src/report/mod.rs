pub mod finding;
pub mod validation;
