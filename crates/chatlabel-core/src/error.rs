use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node {0} is not attached to the document")]
    Detached(u64),

    #[error("Unknown node handle: {0}")]
    UnknownNode(u64),

    #[error("Unsupported selector: {0}")]
    Selector(String),

    #[error("Host DOM call failed: {0}")]
    Host(String),
}

#[derive(Error, Debug)]
pub enum A11yError {
    #[error("Required element not found: {0}")]
    MissingElement(&'static str),

    #[error("DOM operation failed: {0}")]
    Dom(#[from] DomError),

    #[error("Audio cue failed: {0}")]
    Cue(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
