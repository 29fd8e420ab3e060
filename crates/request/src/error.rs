#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response body exceeds maximum size of {limit} bytes")]
    BodyTooLarge { limit: usize },
}
