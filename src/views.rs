//! Server-rendered pages. Templates live in `templates/` and are
//! HTML-escaped by askama.

use actix_web::{http::header::ContentType, http::StatusCode, HttpResponse};
use askama::Template;

use crate::error::AppError;
use crate::models::Todo;

#[derive(Template)]
#[template(path = "index.html")]
pub struct LandingPage {
    pub signup_enabled: bool,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    /// `true` for the username/password form, `false` for the token sign-in page.
    pub local: bool,
    /// Offer the provider's own sign-in button (token strategy with a web config).
    pub provider_sign_in: bool,
    pub error: Option<String>,
    pub username: String,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage {
    pub local: bool,
    pub error: Option<String>,
    pub username: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub todos: Vec<Todo>,
    pub remaining: usize,
    pub can_logout: bool,
}

impl DashboardPage {
    pub fn new(todos: Vec<Todo>, can_logout: bool) -> Self {
        let remaining = todos.iter().filter(|todo| !todo.completed).count();
        Self {
            todos,
            remaining,
            can_logout,
        }
    }
}

/// The provider client config module imported by the token login page.
#[derive(Template)]
#[template(path = "provider-config.js", escape = "none")]
pub struct ProviderConfigScript {
    /// The web config serialised as a JSON object literal.
    pub config: String,
}

#[derive(Template)]
#[template(path = "terms.html")]
pub struct TermsPage;

#[derive(Template)]
#[template(path = "privacy.html")]
pub struct PrivacyPage;

/// Renders `page` as an HTML response with the given status.
pub fn render<T: Template>(status: StatusCode, page: &T) -> Result<HttpResponse, AppError> {
    let body = page.render()?;
    Ok(HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(body))
}
