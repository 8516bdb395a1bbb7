//! Error type shared by the whole crate

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlastError>;

#[derive(Debug, Error)]
pub enum BlastError {
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("active blast set is poisoned")]
    BlastSetPoisoned,
    #[error("display error: {0}")]
    Display(String),
    #[error("control socket error: {0}")]
    Control(String),
    #[error("mqtt error: {0}")]
    Mqtt(String),
}
