use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog rejected the credentials (status {0})")]
    Unauthorized(u16),

    #[error("catalog rate limit hit, retry after {retry_after:?} s")]
    RateLimited { retry_after: Option<u64> },

    #[error("catalog answered {status}: {body}")]
    Http { status: u16, body: String },

    #[error("catalog unreachable: {0}")]
    Transport(String),

    #[error("unexpected catalog response: {0}")]
    Parse(String),

    #[error("catalog is not configured: {0}")]
    Config(String),
}

impl From<ureq::Error> for CatalogError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status @ (401 | 403), _) => CatalogError::Unauthorized(status),
            ureq::Error::Status(429, response) => CatalogError::RateLimited {
                retry_after: response
                    .header("Retry-After")
                    .and_then(|v| v.trim().parse().ok()),
            },
            ureq::Error::Status(status, response) => CatalogError::Http {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(t) => CatalogError::Transport(t.to_string()),
        }
    }
}
