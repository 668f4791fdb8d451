use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("descriptor length {found} does not match reference length {expected}")]
    DescriptorLength { expected: usize, found: usize },
}

pub type MatchResult<T> = std::result::Result<T, MatchError>;
