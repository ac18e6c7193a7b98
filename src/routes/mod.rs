use rocket::{
    catch, get,
    http::Status,
    post,
    response::status,
    serde::{json::Json, Deserialize, Serialize},
    Request, State,
};

use crate::{
    api_key::ApiKey,
    cors::AllowedOrigin,
    leaderboard::Leaderboard,
    score::{lenient, Course, CourseTimes, Device, ScoreRecord, SortDirection},
    store::{now_millis, ScoreStore},
};

mod request_error;

pub use request_error::*;

#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct Health {
    pub ok: bool,
    pub time: i64,
}

/// Body of `POST /scores/submit`. Unusable values read as absent.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ScoreSubmission {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub device: Option<String>,
    #[serde(flatten)]
    pub times: CourseTimes,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SubmitResponse {
    pub ok: bool,
    pub saved: ScoreRecord,
}

#[get("/health")]
pub fn health(_origin: AllowedOrigin) -> Json<Health> {
    Json(Health {
        ok: true,
        time: now_millis(),
    })
}

/// Lists every score record, sorted by the time on `course` (default `c1`).
/// Sorts ascending unless `dir` is `desc`.
#[get("/scores?<course>&<dir>")]
pub async fn list_scores(
    course: Option<&str>,
    dir: Option<&str>,
    _origin: AllowedOrigin,
    store: &State<ScoreStore>,
) -> RequestResult<Json<Leaderboard>> {
    let course = Course::from_query(course);
    let direction = SortDirection::from_query(dir);

    let leaderboard = store.list(course, direction).await?;
    Ok(Json(leaderboard))
}

/// Merges a submission into the player's record, keeping the best time per course.
/// Requires the `x-api-key` header; the key is checked before the body is read.
#[post("/scores/submit", data = "<submission>")]
pub async fn submit_score(
    _origin: AllowedOrigin,
    _api_key: ApiKey,
    submission: Json<ScoreSubmission>,
    store: &State<ScoreStore>,
) -> RequestResult<Json<SubmitResponse>> {
    let submission = submission.into_inner();
    let name = submission.name.unwrap_or_default();
    let device = Device::from_input(submission.device.as_deref());

    let saved = store.submit(&name, device, submission.times).await?;
    Ok(Json(SubmitResponse { ok: true, saved }))
}

#[catch(404)]
pub fn not_found() -> Json<ErrorBody> {
    ErrorBody::new("Not found")
}

#[catch(default)]
pub fn default_catcher(status: Status, _request: &Request<'_>) -> status::Custom<Json<ErrorBody>> {
    status::Custom(status, ErrorBody::new(status.reason_lossy()))
}
