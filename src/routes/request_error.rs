use rocket::{
    http::Status,
    response::{self, status, Responder},
    serde::{json::Json, Deserialize, Serialize},
    Request,
};

use crate::{
    score::SubmissionError,
    store::StoreError,
};

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Json<Self> {
        Json(Self {
            error: error.into(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Invalid(SubmissionError),
    #[error("score store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RequestError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Invalid(error) => Self::Invalid(error),
            error => Self::Store(error),
        }
    }
}

impl RequestError {
    pub fn status(&self) -> Status {
        match self {
            Self::Invalid(_) => Status::BadRequest,
            Self::Store(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for RequestError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let message = match &self {
            Self::Invalid(error) => error.to_string(),
            Self::Store(error) => {
                // Upstream details stay in the server log
                log::error!("{} {} failed: {}", request.method(), request.uri(), error);
                "Internal server error".to_owned()
            }
        };

        status::Custom(self.status(), ErrorBody::new(message)).respond_to(request)
    }
}

pub type RequestResult<T, E = RequestError> = std::result::Result<T, E>;
