mod error;
mod inference;
mod report;
mod routes;
mod state;
mod upload;

#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use inference::{ModelsConfig, select_device};
use routes::configure_routes;
use state::{AppState, DEFAULT_MAX_UPLOAD_BYTES};
use std::env;
use std::path::Path;

const DEFAULT_MODEL_CONFIG: &str = "config/models.yaml";

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config_path = env::var("MODEL_CONFIG").unwrap_or_else(|_| DEFAULT_MODEL_CONFIG.to_string());
    let models = ModelsConfig::load(Path::new(&config_path))
        .map_err(|e| startup_error("Invalid model configuration", e))?;

    let device_name = env::var("DEVICE").unwrap_or_else(|_| "auto".to_string());
    let device = select_device(&device_name).map_err(|e| startup_error("Invalid DEVICE", e))?;
    log::info!("Using device {:?}", device);

    let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
        Ok(value) => value
            .parse::<usize>()
            .map_err(|e| startup_error("Invalid MAX_UPLOAD_BYTES", e))?,
        Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
    };

    let state = AppState::load(&models, device, max_upload_bytes)
        .map_err(|e| startup_error("Model loading failed", e))?;
    let state = web::Data::new(state);

    let frontend_dir = env::var("FRONTEND_DIR").ok();
    if let Some(dir) = &frontend_dir {
        log::info!("Serving frontend from {}", dir);
    }

    let host = env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("{}:{}", host, port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(state.clone())
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
