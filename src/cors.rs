use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Status},
    options,
    request::{FromRequest, Outcome},
    Request, Response,
};

/// Origins allowed to call the server from a browser.
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }
}

/// Succeeds when the request's `Origin` is allowed by the policy.
/// Requests without an `Origin` header always pass.
pub struct AllowedOrigin;

#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("origin {0:?} is not allowed")]
    Rejected(String),
    #[error("no origin policy is configured")]
    Unconfigured,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AllowedOrigin {
    type Error = OriginError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let origin = match request.headers().get_one("Origin") {
            Some(origin) => origin,
            None => return Outcome::Success(AllowedOrigin),
        };

        match request.rocket().state::<OriginPolicy>() {
            Some(policy) if policy.allows(origin) => Outcome::Success(AllowedOrigin),
            Some(_) => {
                log::warn!("Rejected request from origin {}", origin);
                Outcome::Error((Status::Forbidden, OriginError::Rejected(origin.to_owned())))
            }
            None => Outcome::Error((Status::InternalServerError, OriginError::Unconfigured)),
        }
    }
}

/// Adds the CORS response headers for allowed origins.
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let origin = match request.headers().get_one("Origin") {
            Some(origin) => origin,
            None => return,
        };
        let allowed = request
            .rocket()
            .state::<OriginPolicy>()
            .map_or(false, |policy| policy.allows(origin));
        if !allowed {
            return;
        }

        response.set_header(Header::new("Access-Control-Allow-Origin", origin.to_owned()));
        response.set_header(Header::new("Vary", "Origin"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, x-api-key",
        ));
    }
}

/// Answers CORS preflight requests for every path.
#[options("/<_..>")]
pub fn preflight(_origin: AllowedOrigin) -> Status {
    Status::NoContent
}
