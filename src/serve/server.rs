//! Development HTTP server

use super::reload::{reload_message, ReloadHub};
use crate::core::config::ServerConfig;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        Request, WebSocketUpgrade,
    },
    http::{
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, PRAGMA},
        HeaderValue, Method, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::{debug, error, info};

/// Path of the live-reload websocket
pub const RELOAD_SOCKET_PATH: &str = "/__sitepipe/ws";

/// Path of the live-reload client script
pub const RELOAD_CLIENT_PATH: &str = "/__sitepipe/client.js";

const RELOAD_CLIENT: &str = include_str!("client.js");

/// Build the router serving `root` with live reload
pub fn router(root: impl Into<PathBuf>, hub: ReloadHub, cors: bool) -> Router {
    let mut router = Router::new()
        .route(RELOAD_SOCKET_PATH, get(reload_socket))
        .route(RELOAD_CLIENT_PATH, get(reload_client))
        .fallback_service(ServeDir::new(root.into()))
        .layer(middleware::from_fn(inject_reload_client))
        .layer(Extension(hub));

    if cors {
        router = router.layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
                .allow_origin(Any)
                .allow_headers(Any),
        );
    }

    router
}

async fn reload_socket(ws: WebSocketUpgrade, Extension(hub): Extension<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| reload_loop(socket, hub))
}

async fn reload_loop(socket: WebSocket, hub: ReloadHub) {
    debug!("Live reload client connected");
    let (mut sender, mut receiver) = socket.split();
    let mut rx = hub.subscribe();

    loop {
        tokio::select! {
            signal = rx.recv() => {
                let kind = match signal {
                    Ok(kind) => kind,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                };
                let message = Message::Text(reload_message(kind).into());
                if sender.send(message).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("Live reload client disconnected");
}

async fn reload_client() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/javascript; charset=utf-8")],
        RELOAD_CLIENT,
    )
}

/// Add no-cache headers to every response and the reload client to full HTML pages.
///
/// Partial (range) responses and documents that are not UTF-8 pass through untouched.
async fn inject_reload_client(request: Request, next: Next) -> Response {
    let is_head = request.method() == Method::HEAD;
    let mut response = next.run(request).await;
    no_cache(&mut response);

    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));
    if is_head || !is_html || response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("Failed to read HTML response: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = match std::str::from_utf8(&bytes) {
        Ok(html) => inject_script(html),
        Err(_) => {
            debug!("Not injecting reload client into non UTF-8 document");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

fn no_cache(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}

/// Insert the reload client's script tag before the closing `</body>`
pub fn inject_script(html: &str) -> String {
    let tag = format!("<script src=\"{}\"></script>", RELOAD_CLIENT_PATH);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..index]);
            out.push_str(&tag);
            out.push_str(&html[index..]);
            out
        }
        None => format!("{}{}", html, tag),
    }
}

/// A running development server
#[derive(Debug)]
pub struct DevServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl DevServer {
    /// Bind the configured address and serve `root` in the background
    pub async fn start(config: &ServerConfig, root: impl Into<PathBuf>, hub: ReloadHub) -> Result<Self> {
        let bind = format!("{}:{}", config.host, config.port);
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("Failed to bind dev server to {}", bind))?;
        let addr = listener.local_addr()?;

        let app = router(root, hub, config.cors);
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!("Dev server stopped: {}", err);
            }
        });

        info!("Serving on http://{}", addr);
        Ok(Self { addr, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections
    pub fn shutdown(self) {
        self.handle.abort();
    }
}
