use anyhow::Result;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use quire_core::{Registry, RenderContext};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

mod sniff;

pub use sniff::{content_type, detect_content_type};

/// Configuration for the development server
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to serve on
    pub port: u16,
    /// Auto-open browser
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

/// Serves a site straight from its registry, rendering each request on the
/// fly. Nothing is written to disk.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Run the server until the process is stopped
    pub async fn run(self, registry: Arc<Registry>, ctx: RenderContext) -> Result<()> {
        for path in registry.paths() {
            debug!(path, "serving");
        }

        let app = router(registry, ctx);
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("Serving at http://{}", addr);

        if self.config.open {
            if let Err(e) = open::that(format!("http://{}", addr)) {
                warn!(error = %e, "failed to open browser");
            }
        }

        axum::serve(listener, app).await?;

        Ok(())
    }
}

struct AppState {
    registry: Arc<Registry>,
    ctx: RenderContext,
}

/// Router answering every method and path from `registry`.
pub fn router(registry: Arc<Registry>, ctx: RenderContext) -> Router {
    let state = Arc::new(AppState { registry, ctx });

    Router::new()
        .fallback(serve_path)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Map a request path onto a registered path, falling back to
/// `index.html` then `index.htm` inside it.
pub fn resolve_path(registry: &Registry, request_path: &str) -> Option<String> {
    let path = request_path.trim_start_matches('/');
    if registry.has_path(path) {
        return Some(path.to_string());
    }

    let dir = path.trim_end_matches('/');
    ["index.html", "index.htm"]
        .iter()
        .map(|index| {
            if dir.is_empty() {
                index.to_string()
            } else {
                format!("{dir}/{index}")
            }
        })
        .find(|candidate| registry.has_path(candidate))
}

async fn serve_path(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    // Registered paths are plain text, e.g. %20 → space
    let Ok(request_path) = urlencoding::decode(uri.path()) else {
        debug!(path = uri.path(), "path is not valid UTF-8 once decoded");
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(path) = resolve_path(&state.registry, &request_path) else {
        debug!(path = %request_path, "not found");
        return StatusCode::NOT_FOUND.into_response();
    };

    let rendered = {
        let state = Arc::clone(&state);
        let path = path.clone();
        tokio::task::spawn_blocking(move || state.registry.render_path(&state.ctx, &path)).await
    };

    match rendered {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, content_type(&path, &body))], body).into_response(),
        Ok(Err(e)) => {
            error!(%path, error = %e, "render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!(%path, error = %e, "render task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
