pub mod auth;
pub mod health;
pub mod pages;
pub mod todos;

use actix_web::{http::header, web, HttpResponse};

use crate::auth::AuthMode;

pub const DASHBOARD_PATH: &str = "/dashboard";

/// Registers the routes for a deployment running `mode`.
///
/// Login and signup submissions exist only for the local strategy, `/auth`
/// and `/provider-config.js` only for the token strategy.
pub fn config(mode: AuthMode) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(health::health)
            .service(pages::index)
            .service(pages::login_page)
            .service(pages::signup_page)
            .service(pages::terms)
            .service(pages::privacy)
            .service(auth::logout)
            .service(todos::dashboard)
            .service(todos::add_todo)
            .service(todos::toggle_todo)
            .service(todos::delete_todo);

        match mode {
            AuthMode::Local => {
                cfg.service(auth::login).service(auth::signup);
            }
            AuthMode::Token => {
                cfg.service(auth::token_auth).service(pages::provider_config);
            }
            AuthMode::Anonymous => {}
        }
    }
}

/// `303 See Other` to `location`, so a POST is followed by a GET.
pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
