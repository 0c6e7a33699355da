use crate::{
    auth::{
        bearer_token, provider::INVALID_TOKEN, strategy::LOGIN_PATH, AuthStrategy,
        CurrentIdentity, Identity, LoginForm, SignupForm,
    },
    error::AppError,
    routes::{redirect, DASHBOARD_PATH},
    state::AppState,
    views::{render, LoginPage, SignupPage},
};
use actix_web::{get, http::header, http::StatusCode, post, web, HttpRequest, HttpResponse};
use serde_json::json;

fn strategy_not_enabled() -> AppError {
    AppError::NotFound("Not found".into())
}

/// Log in with a local account
///
/// On success the session identity becomes the user's id and the browser is
/// sent to the dashboard. Unknown usernames and wrong passwords re-render the
/// form with the same message and a `401`.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let AuthStrategy::Local(local) = &state.strategy else {
        return Err(strategy_not_enabled());
    };

    let form = form.into_inner();
    let username = form.username.clone();
    match local.login(form).await {
        Ok(user) => {
            let cookie = state.sessions.cookie(&Identity::Local { user_id: user.id })?;
            log::info!("User {} logged in", user.id);
            Ok(HttpResponse::SeeOther()
                .insert_header((header::LOCATION, DASHBOARD_PATH))
                .cookie(cookie)
                .finish())
        }
        Err(AppError::Unauthorized(message)) => {
            log::warn!("Failed login attempt");
            render(
                StatusCode::UNAUTHORIZED,
                &LoginPage {
                    local: true,
                    provider_sign_in: false,
                    error: Some(message),
                    username,
                },
            )
        }
        Err(e) => Err(e),
    }
}

/// Register a new local account
///
/// Redirects to the login page on success. Invalid input and an already
/// registered username or email re-render the form with a `400`.
#[post("/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse, AppError> {
    let AuthStrategy::Local(local) = &state.strategy else {
        return Err(strategy_not_enabled());
    };

    let form = form.into_inner();
    let (username, email) = (form.username.clone(), form.email.clone());
    match local.signup(form).await {
        Ok(user) => {
            log::info!("Registered user {} ({})", user.id, user.username);
            Ok(redirect(LOGIN_PATH))
        }
        Err(AppError::BadRequest(message)) => {
            log::warn!("Rejected signup: {}", message);
            render(
                StatusCode::BAD_REQUEST,
                &SignupPage {
                    local: true,
                    error: Some(message),
                    username,
                    email,
                },
            )
        }
        Err(e) => Err(e),
    }
}

/// Exchange an identity-provider ID token for a session
///
/// Expects `Authorization: Bearer <token>`. Every verification failure is a
/// `401` with the same body.
#[post("/auth")]
pub async fn token_auth(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let AuthStrategy::ExternalToken(provider) = &state.strategy else {
        return Err(strategy_not_enabled());
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.into()))?;

    let claims = provider.verify_id_token(token).map_err(|e| {
        log::warn!("Rejected provider token");
        e
    })?;

    let identity = Identity::External {
        uid: claims.sub,
        email: claims.email,
    };
    let cookie = state.sessions.cookie(&identity)?;
    log::info!("Provider session started for {}", identity.owner_key());

    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "status": "success",
        "redirect": DASHBOARD_PATH
    })))
}

/// End the session and return to the login page.
#[get("/logout", wrap = "crate::auth::RequireIdentity")]
pub async fn logout(state: web::Data<AppState>, identity: CurrentIdentity) -> HttpResponse {
    log::info!("Session closed for {}", identity.owner_key());
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, LOGIN_PATH))
        .cookie(state.sessions.removal_cookie())
        .finish()
}
