// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, data source, and start HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod models;
#[cfg(test)]
mod test_support;

use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Config;
use db::{CommentRepository, PhotoRepository};
use dotenv::dotenv;
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            &config.log_level
        } else {
            "info,actix_web=info,sqlx=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting social-photos service...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Initialize data source
    let source = match config::init_data_source(&config).await {
        Ok(source) => source,
        Err(e) => {
            log::error!("Failed to initialize data source: {}", e);
            std::process::exit(1);
        }
    };

    // 5. Build repositories shared by every worker
    let photos = web::Data::new(PhotoRepository::new(source.clone()));
    let comments = web::Data::new(CommentRepository::new(source));

    // 6. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);

    HttpServer::new(move || {
        App::new()
            // Application state (repositories)
            .app_data(photos.clone())
            .app_data(comments.clone())
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
