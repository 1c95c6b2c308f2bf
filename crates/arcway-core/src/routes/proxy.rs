//! The data-plane HTTP surface: `/proxy/*` forwards through the
//! [`crate::forwarder::Forwarder`], `/ws/*` hands the upgraded connection to
//! the [`crate::bridge::Bridge`].

use crate::bridge::Bridge;
use crate::forwarder::Forwarder;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use log::warn;
use std::sync::Arc;

async fn proxy_request(
    req: HttpRequest,
    body: web::Bytes,
    forwarder: web::Data<Arc<Forwarder>>,
) -> Result<HttpResponse, Error> {
    let path = format!("/{}", req.match_info().query("tail"));
    let client_ip = req.peer_addr().map(|a| a.ip().to_string());
    let response = forwarder
        .handle(req.method(), &path, req.headers(), body.to_vec(), client_ip)
        .await?;
    Ok(response)
}

async fn websocket_upgrade(
    req: HttpRequest,
    stream: web::Payload,
    forwarder: web::Data<Arc<Forwarder>>,
    bridge: web::Data<Arc<Bridge>>,
) -> Result<HttpResponse, Error> {
    let path = format!("/{}", req.match_info().query("tail"));
    let (route, target_path) = match forwarder.match_route(&path, "GET").await {
        Ok(found) => found,
        Err(e) => {
            warn!("websocket route lookup failed for {path}: {e}");
            return Ok(HttpResponse::NotFound().finish());
        }
    };
    bridge.handle(req, stream, &route, &target_path).await
}

/// Registers the `/proxy/{tail:.*}` and `/ws/{tail:.*}` data-plane surfaces,
/// capping request bodies at 1MiB.
pub fn configure_proxy(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(1024 * 1024))
        .service(web::resource("/proxy/{tail:.*}").to(proxy_request))
        .service(web::resource("/ws/{tail:.*}").route(web::get().to(websocket_upgrade)));
}
