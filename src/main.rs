use std::io;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tickbox::{auth::SessionMiddleware, config::Config, db, routes, AppState};

fn startup_error(error: impl std::fmt::Display) -> io::Error {
    log::error!("Startup failed: {}", error);
    io::Error::new(io::ErrorKind::Other, error.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(startup_error)?;
    let pool = db::connect(&config.database_url)
        .await
        .map_err(startup_error)?;
    let state = web::Data::new(AppState::from_config(&config, pool).map_err(startup_error)?);
    let mode = config.auth_mode;

    log::info!(
        "Starting Tickbox at {} (auth mode: {})",
        config.server_url(),
        mode
    );
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(SessionMiddleware)
            .wrap(Logger::default())
            .configure(routes::config(mode))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
