use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};

use super::{KeyVerifier, API_KEY_HEADER};

/// A request guard that only succeeds for requests carrying a valid API key.
pub struct ApiKey;

#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    #[error("the key is missing")]
    Missing,
    #[error("the key is invalid")]
    Invalid,
    #[error("no key verifier is configured")]
    Unconfigured,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ApiKey {
    type Error = ApiKeyError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let verifier = match request.rocket().state::<Box<dyn KeyVerifier>>() {
            Some(verifier) => verifier,
            None => {
                log::error!("API key verifier is missing from the managed state");
                return Outcome::Error((Status::InternalServerError, ApiKeyError::Unconfigured));
            }
        };

        match request.headers().get_one(API_KEY_HEADER) {
            None => Outcome::Error((Status::Unauthorized, ApiKeyError::Missing)),
            Some(key) if verifier.verify(key) => Outcome::Success(ApiKey),
            Some(_) => Outcome::Error((Status::Unauthorized, ApiKeyError::Invalid)),
        }
    }
}
