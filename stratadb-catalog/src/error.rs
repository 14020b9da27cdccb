use semistr::SemiStr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("attribute '{0}' already exists")]
    AttributeAlreadyExists(SemiStr),
    #[error("attribute '{0}' not exists")]
    AttributeNotExists(SemiStr),
    #[error("relation must have at least one attribute")]
    EmptyRelation,
    #[error("invalid attribute size {0}")]
    InvalidAttributeSize(usize),
}
