#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::{test, web};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::json;
use sqlx::SqlitePool;

use tickbox::auth::{
    AuthMode, AuthStrategy, JwtIdentityProvider, LocalAuthenticator, ProviderCredentials,
    SessionKeys, SESSION_COOKIE,
};
use tickbox::notify::{Email, MailError, Mailer, Notifier};
use tickbox::store::{TodoStore, UserStore};
use tickbox::config::Config;
use tickbox::{db, AppState};

pub const SECRET: &[u8] = b"integration-test-secret-0123456789";
pub const PROJECT_ID: &str = "tickbox-test";
const PUBLIC_KEY: &str = include_str!("../fixtures/provider_public.pem");
const PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/provider_private.pem");

/// Builds and initializes the full application for a test context.
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .wrap(tickbox::auth::SessionMiddleware)
                .configure(tickbox::routes::config($ctx.state.strategy.mode())),
        )
        .await
    };
}

/// Records every message; optionally reports each delivery as failed.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.sent.lock().push(email);
        if self.fail {
            return Err(MailError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub pool: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
    pub provider: Option<Arc<JwtIdentityProvider>>,
}

pub async fn context(mode: AuthMode) -> TestContext {
    build(mode, false).await
}

pub async fn context_with_failing_mail(mode: AuthMode) -> TestContext {
    build(mode, true).await
}

async fn build(mode: AuthMode, mail_fails: bool) -> TestContext {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open test database");
    let users = UserStore::new(pool.clone());
    let mailer = Arc::new(RecordingMailer {
        sent: Mutex::new(Vec::new()),
        fail: mail_fails,
    });

    let mut provider = None;
    let strategy = match mode {
        AuthMode::Anonymous => AuthStrategy::Anonymous,
        AuthMode::Local => AuthStrategy::Local(
            LocalAuthenticator::new(users.clone(), 4).expect("Failed to build authenticator"),
        ),
        AuthMode::Token => {
            let credentials = ProviderCredentials {
                project_id: PROJECT_ID.into(),
                public_key_pem: Some(PUBLIC_KEY.into()),
                ..Default::default()
            };
            let jwt = Arc::new(
                JwtIdentityProvider::new(&credentials, 60).expect("Failed to build provider"),
            );
            provider = Some(jwt.clone());
            AuthStrategy::ExternalToken(jwt)
        }
    };

    let state = web::Data::new(AppState {
        todos: TodoStore::new(pool.clone()),
        sessions: SessionKeys::new(SECRET, 86_400, true),
        strategy,
        notifier: Notifier::new(
            mailer.clone(),
            users,
            "user@example.com".into(),
            Duration::from_secs(1),
        ),
    });

    TestContext {
        state,
        pool,
        mailer,
        provider,
    }
}

/// Application state built from configuration, the way the binary builds it.
pub struct ConfiguredContext {
    pub state: web::Data<AppState>,
}

pub async fn configured(pairs: &[(&str, &str)]) -> ConfiguredContext {
    let mut vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    vars.entry("SECRET_KEY".into())
        .or_insert_with(|| String::from_utf8_lossy(SECRET).into_owned());

    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test config");
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open test database");
    let state = AppState::from_config(&config, pool).expect("Failed to build state");

    ConfiguredContext {
        state: web::Data::new(state),
    }
}

/// Writes a provider credential file holding the fixture public key plus
/// `extra` fields, and returns its path.
pub fn write_credentials(name: &str, extra: serde_json::Value) -> PathBuf {
    let mut body = json!({ "project_id": PROJECT_ID, "public_key_pem": PUBLIC_KEY });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            body.insert(key.clone(), value.clone());
        }
    }

    let path = std::env::temp_dir().join(format!(
        "tickbox-{}-{}.json",
        name,
        std::process::id()
    ));
    std::fs::write(&path, body.to_string()).expect("Failed to write credentials");
    path
}

/// An ID token signed like the identity provider would.
pub fn provider_token(sub: &str, email: Option<&str>, iat_offset: i64, exp_offset: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "sub": sub,
        "email": email,
        "aud": PROJECT_ID,
        "iss": format!("https://securetoken.google.com/{}", PROJECT_ID),
        "iat": now + iat_offset,
        "exp": now + exp_offset,
    });
    encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(PRIVATE_KEY).expect("Invalid test private key"),
    )
    .expect("Failed to sign provider token")
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.into_owned())
}

pub fn location<B>(resp: &ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn signup(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    email: &str,
    password: &str,
) -> ServiceResponse<impl MessageBody> {
    let req = test::TestRequest::post()
        .uri("/signup")
        .set_form(vec![
            ("username", username),
            ("email", email),
            ("password", password),
        ])
        .to_request();
    test::call_service(app, req).await
}

pub async fn login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    password: &str,
) -> ServiceResponse<impl MessageBody> {
    let req = test::TestRequest::post()
        .uri("/login")
        .set_form(vec![("username", username), ("password", password)])
        .to_request();
    test::call_service(app, req).await
}

/// Signs up and logs in, returning the session cookie.
pub async fn register_and_login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    email: &str,
    password: &str,
) -> Cookie<'static> {
    let resp = signup(app, username, email, password).await;
    assert_eq!(
        resp.status(),
        actix_web::http::StatusCode::SEE_OTHER,
        "signup failed"
    );

    let resp = login(app, username, password).await;
    assert_eq!(
        resp.status(),
        actix_web::http::StatusCode::SEE_OTHER,
        "login failed"
    );
    session_cookie(&resp).expect("login did not set a session cookie")
}

pub async fn todo_rows(pool: &SqlitePool) -> Vec<(i64, String, String, bool)> {
    sqlx::query_as("SELECT id, owner_id, title, completed FROM todos ORDER BY id")
        .fetch_all(pool)
        .await
        .expect("Failed to read todos")
}

pub async fn body_string(resp: ServiceResponse<impl MessageBody>) -> String {
    String::from_utf8_lossy(&test::read_body(resp).await).into_owned()
}
