use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown agent state: {0}")]
    UnknownState(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
