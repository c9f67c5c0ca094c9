use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("hierarchy request error: {0}")]
    Hierarchy(String),
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("node {0} is not an element")]
    NotAnElement(usize),
}
