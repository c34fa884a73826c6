use crate::error::ApiError;
use crate::feed::{RequestEnvironment, V2FeedController, V2FeedPackage};
use crate::state::AppState;
use log::debug;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::{State, get, post};

/// The client's `User-Agent`, if it sent one.
pub struct UserAgent(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserAgent {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(UserAgent(
            request.headers().get_one("User-Agent").map(str::to_string),
        ))
    }
}

fn controller(
    state: &AppState,
    environment: RequestEnvironment,
) -> V2FeedController<RequestEnvironment> {
    V2FeedController::new(state.context(), environment)
}

#[get("/api/v2/Packages?<skip>&<top>")]
pub async fn list_packages(
    skip: Option<usize>,
    top: Option<usize>,
    environment: RequestEnvironment,
    state: &State<AppState>,
) -> Result<Json<Vec<V2FeedPackage>>, ApiError> {
    let packages = controller(state, environment).packages(skip.unwrap_or(0), top)?;
    Ok(Json(packages))
}

#[get("/api/v2/FindPackagesById?<id>")]
pub async fn find_packages_by_id(
    id: &str,
    environment: RequestEnvironment,
    state: &State<AppState>,
) -> Result<Json<Vec<V2FeedPackage>>, ApiError> {
    let packages = controller(state, environment).find_packages_by_id(id)?;
    debug!("FindPackagesById '{id}' matched {} version(s)", packages.len());
    Ok(Json(packages))
}

#[get("/api/v2/Search?<q>")]
pub async fn search(
    q: Option<&str>,
    environment: RequestEnvironment,
    state: &State<AppState>,
) -> Result<Json<Vec<V2FeedPackage>>, ApiError> {
    let packages = controller(state, environment).search(q.unwrap_or(""))?;
    Ok(Json(packages))
}

#[post("/api/v2/package/<id>/<version>/download")]
pub async fn record_download(
    id: &str,
    version: &str,
    user_agent: UserAgent,
    environment: RequestEnvironment,
    state: &State<AppState>,
) -> Result<Json<V2FeedPackage>, ApiError> {
    controller(state, environment)
        .record_download(id, version, user_agent.0)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Package '{id}' {version} not found")))
}
