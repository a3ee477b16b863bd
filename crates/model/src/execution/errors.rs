use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobSpecError {
    #[error("job spec field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error(
        "invalid table name '{0}': expected 3-63 alphanumeric characters starting with a letter"
    )]
    InvalidTableName(String),

    #[error("job reads a local file but names no container to hold its checkpoint")]
    MissingContainer,
}
