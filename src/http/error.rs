use log::error;
use rouille::Response;
use serde::Serialize;

use crate::engine::error::VoteError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl From<VoteError> for ApiError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::InvalidQuery(_) => ApiError::BadRequest(err.to_string()),
            VoteError::NotFound => ApiError::NotFound(err.to_string()),
            VoteError::AlreadyInPlaylist(reason) => ApiError::Conflict(reason),
            VoteError::CatalogUnavailable(_) => {
                error!("{err}");
                ApiError::Unavailable("music catalog unavailable, please retry later".into())
            }
            VoteError::StoreUnavailable(_) => {
                error!("{err}");
                ApiError::Unavailable("vote ledger unavailable, please retry later".into())
            }
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Internal(_) => 500,
            ApiError::Unavailable(_) => 503,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        let msg = match &self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unavailable(msg)
            | ApiError::Internal(msg) => msg,
        };
        Response::json(&ErrorBody { error: msg }).with_status_code(status)
    }
}
