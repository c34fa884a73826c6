use crate::state::AppState;
use rocket::serde::json::Json;
use rocket::{State, get};

// Health check endpoint
#[get("/api/v1/health")]
pub async fn health_check(state: &State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "read_only": state.config.read_only,
    }))
}
