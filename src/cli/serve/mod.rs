//! Development server: artifact HTTP server plus the watch/build/reload
//! actor system.

mod lifecycle;
mod path;
mod response;

use crate::{
    config::{BridgeConfig, cfg},
    core::{is_serving, is_shutdown, register_server},
    log,
};
use anyhow::Result;
use crossbeam::channel;
use std::net::SocketAddr;
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop.
///
/// Requests arriving before the initial build finished get a 503 instead of
/// a connection error.
pub fn bind_server() -> Result<BoundServer> {
    let config = cfg();
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_server(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}{}/", addr, crate::reload::message::ARTIFACT_PREFIX);

    Ok(BoundServer {
        server,
        addr,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the actor system and the request loop (blocking).
    pub fn run(self) -> Result<()> {
        let actor_handle = lifecycle::spawn_actors(cfg(), self.shutdown_rx);
        run_request_loop(&self.server);
        lifecycle::wait_for_shutdown(actor_handle);
        Ok(())
    }
}

/// `hotbridge serve`.
pub fn serve_module() -> Result<()> {
    bind_server()?.run()
}

fn run_request_loop(server: &Server) {
    for request in server.incoming_requests() {
        // Re-read per request: hotbridge.toml may move out_dir
        let config = cfg();
        if let Err(e) = handle_request(request, &config) {
            log!("serve"; "request error: {e}");
        }
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, config: &BridgeConfig) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    if !path::is_artifact_url(request.url()) {
        return response::respond_not_found(request);
    }

    if let Some(file) = path::resolve_path(request.url(), &config.module.out_dir) {
        return response::respond_file(request, &file);
    }

    if !is_serving() {
        return response::respond_loading(request);
    }

    response::respond_not_found(request)
}
