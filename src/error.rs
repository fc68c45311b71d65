use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("tokenizer error: {0}")]
    Tokenizer(tokenizers::Error),

    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing model file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("label mapping error: {0}")]
    LabelMapping(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("model returned {found} occluded rows for {expected} maskable tokens")]
    OcclusionRows { expected: usize, found: usize },

    #[error("input text is empty")]
    EmptyInput,
}

// `tokenizers::Error` is a boxed trait object, so it cannot be a `#[source]`.
impl From<tokenizers::Error> for Error {
    fn from(err: tokenizers::Error) -> Self {
        Self::Tokenizer(err)
    }
}

impl Error {
    pub fn label_mapping(msg: impl Into<String>) -> Self {
        Self::LabelMapping(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
