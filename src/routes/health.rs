use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
///
/// Reports the active authentication strategy and whether the todo store
/// answers a trivial query.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let database = match state.todos.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            log::error!("Health check failed: {}", e);
            "unavailable"
        }
    };

    let body = json!({
        "status": if database == "ok" { "ok" } else { "degraded" },
        "database": database,
        "auth_mode": state.strategy.mode().to_string(),
        "timestamp": Utc::now()
    });

    if database == "ok" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
