use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};

use evaluation_server::{app_state::AppState, config::Config, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    config.validate_for_production();

    let host = config.web_server_host.clone();
    let port = config.web_server_port;

    let state = match AppState::new(config).await {
        Ok(state) => Arc::new(state),
        Err(err) => {
            log::error!("Failed to initialise application state: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()));
        }
    };

    log::info!("Starting evaluation server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
