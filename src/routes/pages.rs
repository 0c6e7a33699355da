use actix_web::{get, http::StatusCode, web, HttpResponse};
use askama::Template;

use crate::auth::{AuthMode, AuthStrategy, CurrentIdentity, ProviderWebConfig};
use crate::error::AppError;
use crate::routes::{redirect, DASHBOARD_PATH};
use crate::state::AppState;
use crate::views::{
    render, LandingPage, LoginPage, PrivacyPage, ProviderConfigScript, SignupPage, TermsPage,
};

/// Sends signed-in visitors to their dashboard, everyone else to the landing page.
#[get("/")]
pub async fn index(
    state: web::Data<AppState>,
    identity: Option<CurrentIdentity>,
) -> Result<HttpResponse, AppError> {
    if identity.is_some() {
        return Ok(redirect(DASHBOARD_PATH));
    }
    render(
        StatusCode::OK,
        &LandingPage {
            signup_enabled: state.strategy.mode() == AuthMode::Local,
        },
    )
}

#[get("/login")]
pub async fn login_page(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    match state.strategy.mode() {
        // Nothing to log in to: everyone is the default user.
        AuthMode::Anonymous => Ok(redirect(DASHBOARD_PATH)),
        mode => render(
            StatusCode::OK,
            &LoginPage {
                local: mode == AuthMode::Local,
                provider_sign_in: provider_web_config(&state).is_some(),
                error: None,
                username: String::new(),
            },
        ),
    }
}

/// The provider's client SDK config as an ES module, for the token login page.
///
/// `404` when the credential file carries no web config.
#[get("/provider-config.js")]
pub async fn provider_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = provider_web_config(&state)
        .ok_or_else(|| AppError::NotFound("Not found".into()))?;
    let script = ProviderConfigScript {
        config: serde_json::to_string(config).map_err(|e| {
            AppError::InternalServerError(format!("Failed to encode provider config: {}", e))
        })?,
    };
    Ok(HttpResponse::Ok()
        .content_type("text/javascript; charset=utf-8")
        .body(script.render()?))
}

fn provider_web_config(state: &AppState) -> Option<&ProviderWebConfig> {
    match &state.strategy {
        AuthStrategy::ExternalToken(provider) => provider.web_config(),
        _ => None,
    }
}

#[get("/signup")]
pub async fn signup_page(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    render(
        StatusCode::OK,
        &SignupPage {
            local: state.strategy.mode() == AuthMode::Local,
            error: None,
            username: String::new(),
            email: String::new(),
        },
    )
}

#[get("/terms")]
pub async fn terms() -> Result<HttpResponse, AppError> {
    render(StatusCode::OK, &TermsPage)
}

#[get("/privacy")]
pub async fn privacy() -> Result<HttpResponse, AppError> {
    render(StatusCode::OK, &PrivacyPage)
}
