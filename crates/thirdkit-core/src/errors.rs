use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThirdError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("image error: {0}")]
    Image(String),
    #[error("resource still {size} bytes after compression (limit {ceiling})")]
    ResourceTooLarge { size: usize, ceiling: usize },
    #[error("malformed vendor payload: {0}")]
    MalformedPayload(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<url::ParseError> for ThirdError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

impl From<image::ImageError> for ThirdError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}
