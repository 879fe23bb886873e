use crate::controls::ControlId;
use crate::model::AttributeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Attribute not found: {0}")]
    AttributeNotFound(AttributeId),

    #[error("Control not found: {0}")]
    ControlNotFound(ControlId),

    /// The attribute was handed to propagation before any control owned it.
    #[error("Attribute {0} has not been routed to a control")]
    Unrouted(AttributeId),

    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl HostError {
    /// Contract violations are programming errors on the caller's side.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, HostError::Unrouted(_) | HostError::Contract(_))
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
