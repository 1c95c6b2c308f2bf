//! Arcway API Gateway Server
//!
//! High-performance programmable reverse proxy built with Rust and Actix Web.
//!
//! This binary wires the `arcway-core` data plane — Config Store, Route
//! Matcher, Transformer Engine, Circuit Breaker Registry, Processor, Event
//! Bus, HTTP Forwarder, and WebSocket Bridge — into a running server.

use arcway_core::bridge::{ActiveSocketRegistry, Bridge};
use arcway_core::breaker::CircuitBreakerRegistry;
use arcway_core::config::bootstrap::{load_settings, Settings};
use arcway_core::config::store::{ConfigStore, InMemoryConfigStore};
use arcway_core::engine::TransformerEngine;
use arcway_core::events::EventBus;
use arcway_core::forwarder::Forwarder;
use arcway_core::logs::logger::configure_logger;
use arcway_core::logs::sink::LogSink;
use arcway_core::middleware::security::{cors_headers, security_headers};
use arcway_core::processor::Processor;
use arcway_core::routes::admin::{configure_admin, AdminState};
use arcway_core::routes::{health, proxy};

use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use std::sync::Arc;
use tokio::signal;

const LOG_SINK_CAPACITY: usize = 10_000;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    let settings: Settings = load_settings().expect("failed to load bootstrap settings");
    settings.validate().expect("invalid bootstrap settings");

    info!("Starting Arcway gateway v{}", settings.version);

    let config_store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    let events = Arc::new(EventBus::new());
    let engine = Arc::new(TransformerEngine::new());
    let processor = Arc::new(Processor::<Vec<u8>>::new());
    let breakers = Arc::new(CircuitBreakerRegistry::new());
    let log_sink = Arc::new(LogSink::new(LOG_SINK_CAPACITY));
    let active_sockets = Arc::new(ActiveSocketRegistry::new());

    let forwarder = Arc::new(
        Forwarder::new(
            config_store.clone(),
            breakers.clone(),
            processor.clone(),
            engine.clone(),
            events.clone(),
            log_sink.clone(),
            &settings.http_client,
        )
        .expect("failed to build the HTTP forwarder"),
    );
    let bridge = Arc::new(Bridge::new(config_store.clone(), engine.clone(), active_sockets.clone()));

    let admin_state = web::Data::new(AdminState {
        config_store: config_store.clone(),
        forwarder: forwarder.clone(),
        engine: engine.clone(),
        events: events.clone(),
    });
    let config_store_data = web::Data::new(config_store.clone());
    let forwarder_data = web::Data::new(forwarder);
    let bridge_data = web::Data::new(bridge);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(100)
        .burst_size(200)
        .finish()
        .expect("static governor config is always valid");

    let host = settings.bind_address.clone();
    let port = settings.bind_port;

    info!("Starting server on {}:{}", host, port);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(admin_state.clone())
            .app_data(config_store_data.clone())
            .app_data(forwarder_data.clone())
            .app_data(bridge_data.clone())
            .wrap(Governor::new(&governor_conf))
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
            ))
            .wrap(actix_web::middleware::Compress::default())
            .wrap(security_headers())
            .wrap(cors_headers())
            .configure(health::configure_health)
            .configure(configure_admin)
            .configure(proxy::configure_proxy)
    })
    .bind((host.as_str(), port))?
    .run();

    tokio::select! {
        result = server => {
            match result {
                Ok(_) => info!("Server stopped gracefully"),
                Err(e) => error!("Server error: {}", e),
            }
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
        }
    }

    Ok(())
}
