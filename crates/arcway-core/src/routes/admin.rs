//! The Admin HTTP API: CRUD over endpoints, routes, and transformers.
//!
//! Every write invalidates the derived structures that cache these entities
//! (the Forwarder's route index, the Transformer Engine's compiled cache)
//! and publishes a [`crate::models::event::ConfigEvent`] so external
//! observers can follow suit.

use crate::config::store::ConfigStore;
use crate::config::validation::ConfigValidator;
use crate::engine::TransformerEngine;
use crate::error::GatewayError;
use crate::events::EventBus;
use crate::forwarder::Forwarder;
use crate::models::endpoint::Endpoint;
use crate::models::event::{ConfigEvent, ConfigEventName};
use crate::models::route::Route;
use crate::models::transformer::Transformer;
use actix_web::{web, HttpResponse};
use std::sync::Arc;

pub struct AdminState {
    pub config_store: Arc<dyn ConfigStore>,
    pub forwarder: Arc<Forwarder>,
    pub engine: Arc<TransformerEngine>,
    pub events: Arc<EventBus>,
}

fn config_event(name: ConfigEventName, entity_id: &str) -> ConfigEvent {
    ConfigEvent {
        name,
        entity_id: entity_id.to_string(),
        timestamp: chrono::Utc::now(),
    }
}

/// Runs the cross-entity validator over the configuration that would result
/// from accepting `endpoints`/`routes`/`transformers`, rejecting the write
/// with a [`GatewayError::Validation`] if any check fails. Warnings and
/// recommendations are logged by the validator itself but never block a
/// write.
fn reject_if_invalid(endpoints: &[Endpoint], routes: &[Route], transformers: &[Transformer]) -> Result<(), GatewayError> {
    let result = ConfigValidator::validate_comprehensive(endpoints, routes, transformers);
    if !result.is_valid {
        return Err(GatewayError::Validation(result.errors.join("; ")));
    }
    Ok(())
}

// --- endpoints ---

async fn list_endpoints(state: web::Data<AdminState>) -> Result<HttpResponse, GatewayError> {
    Ok(HttpResponse::Ok().json(state.config_store.list_active_endpoints()?))
}

async fn get_endpoint(state: web::Data<AdminState>, id: web::Path<String>) -> Result<HttpResponse, GatewayError> {
    match state.config_store.get_endpoint_by_id(&id)? {
        Some(endpoint) => Ok(HttpResponse::Ok().json(endpoint)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "not_found",
            "message": format!("no endpoint with id {id}"),
        }))),
    }
}

async fn upsert_endpoint(state: web::Data<AdminState>, endpoint: web::Json<Endpoint>) -> Result<HttpResponse, GatewayError> {
    let endpoint = endpoint.into_inner();
    let mut endpoints = state.config_store.list_active_endpoints()?;
    endpoints.retain(|e| e.id != endpoint.id);
    endpoints.push(endpoint.clone());
    let routes = state.config_store.list_active_routes()?;
    let transformers = state.config_store.list_active_transformers()?;
    reject_if_invalid(&endpoints, &routes, &transformers)?;

    state.config_store.upsert_endpoint(endpoint.clone())?;
    state.forwarder.refresh_routes().await?;
    state.events.publish_config_change(config_event(ConfigEventName::EndpointUpdated, &endpoint.id));
    Ok(HttpResponse::Ok().json(endpoint))
}

async fn delete_endpoint(state: web::Data<AdminState>, id: web::Path<String>) -> Result<HttpResponse, GatewayError> {
    state.config_store.delete_endpoint(&id)?;
    state.forwarder.refresh_routes().await?;
    state.events.publish_config_change(config_event(ConfigEventName::EndpointUpdated, &id));
    Ok(HttpResponse::NoContent().finish())
}

// --- routes ---

async fn list_routes(state: web::Data<AdminState>) -> Result<HttpResponse, GatewayError> {
    Ok(HttpResponse::Ok().json(state.config_store.list_active_routes()?))
}

async fn get_route(state: web::Data<AdminState>, id: web::Path<String>) -> Result<HttpResponse, GatewayError> {
    let found = state
        .config_store
        .list_active_routes()?
        .into_iter()
        .find(|r| r.id == *id);
    match found {
        Some(route) => Ok(HttpResponse::Ok().json(route)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "not_found",
            "message": format!("no route with id {id}"),
        }))),
    }
}

async fn upsert_route(state: web::Data<AdminState>, route: web::Json<Route>) -> Result<HttpResponse, GatewayError> {
    let route = route.into_inner();
    let endpoints = state.config_store.list_active_endpoints()?;
    let mut routes = state.config_store.list_active_routes()?;
    routes.retain(|r| r.id != route.id);
    routes.push(route.clone());
    let transformers = state.config_store.list_active_transformers()?;
    reject_if_invalid(&endpoints, &routes, &transformers)?;

    state.config_store.upsert_route(route.clone())?;
    state.forwarder.refresh_routes().await?;
    state.events.publish_config_change(config_event(ConfigEventName::RouteUpdated, &route.id));
    Ok(HttpResponse::Ok().json(route))
}

async fn delete_route(state: web::Data<AdminState>, id: web::Path<String>) -> Result<HttpResponse, GatewayError> {
    state.config_store.delete_route(&id)?;
    state.forwarder.refresh_routes().await?;
    state.events.publish_config_change(config_event(ConfigEventName::RouteUpdated, &id));
    Ok(HttpResponse::NoContent().finish())
}

// --- transformers ---

async fn list_transformers(state: web::Data<AdminState>) -> Result<HttpResponse, GatewayError> {
    Ok(HttpResponse::Ok().json(state.config_store.list_active_transformers()?))
}

async fn get_transformer(state: web::Data<AdminState>, id: web::Path<String>) -> Result<HttpResponse, GatewayError> {
    match state.config_store.get_transformer_by_id(&id)? {
        Some(transformer) => Ok(HttpResponse::Ok().json(transformer)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "not_found",
            "message": format!("no transformer with id {id}"),
        }))),
    }
}

async fn upsert_transformer(state: web::Data<AdminState>, transformer: web::Json<Transformer>) -> Result<HttpResponse, GatewayError> {
    let transformer = transformer.into_inner();
    let endpoints = state.config_store.list_active_endpoints()?;
    let routes = state.config_store.list_active_routes()?;
    let mut transformers = state.config_store.list_active_transformers()?;
    transformers.retain(|t| t.id != transformer.id);
    transformers.push(transformer.clone());
    reject_if_invalid(&endpoints, &routes, &transformers)?;

    state.engine.compile(&transformer).await?;
    state.config_store.upsert_transformer(transformer.clone())?;
    state.events.publish_config_change(config_event(ConfigEventName::TransformerUpdated, &transformer.id));
    Ok(HttpResponse::Ok().json(transformer))
}

async fn delete_transformer(state: web::Data<AdminState>, id: web::Path<String>) -> Result<HttpResponse, GatewayError> {
    state.config_store.delete_transformer(&id)?;
    state.engine.remove(&id).await;
    state.events.publish_config_change(config_event(ConfigEventName::TransformerUpdated, &id));
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(
                web::resource("/endpoints")
                    .route(web::get().to(list_endpoints))
                    .route(web::post().to(upsert_endpoint)),
            )
            .service(
                web::resource("/endpoints/{id}")
                    .route(web::get().to(get_endpoint))
                    .route(web::put().to(upsert_endpoint))
                    .route(web::delete().to(delete_endpoint)),
            )
            .service(
                web::resource("/routes")
                    .route(web::get().to(list_routes))
                    .route(web::post().to(upsert_route)),
            )
            .service(
                web::resource("/routes/{id}")
                    .route(web::get().to(get_route))
                    .route(web::put().to(upsert_route))
                    .route(web::delete().to(delete_route)),
            )
            .service(
                web::resource("/transformers")
                    .route(web::get().to(list_transformers))
                    .route(web::post().to(upsert_transformer)),
            )
            .service(
                web::resource("/transformers/{id}")
                    .route(web::get().to(get_transformer))
                    .route(web::put().to(upsert_transformer))
                    .route(web::delete().to(delete_transformer)),
            ),
    );
}
