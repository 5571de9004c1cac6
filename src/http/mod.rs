//! HTTP surface.
//!
//! - `GET /health`: liveness and model readiness
//! - `POST /generate`: `{prompt, duration?}` to a WAV path
//! - `GET /test`: fixed reference tone (model mode only)
//!
//! Generation runs on the blocking pool, so slow requests never hold up the
//! listener.

mod error;
mod handlers;

pub use error::HttpError;
pub use handlers::{GenerateResponse, HealthResponse, TestToneResponse};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

use crate::generator::{AudioGenerator, GeneratorMode};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn AudioGenerator>,
    pub output_dir: PathBuf,
    pub max_duration_sec: f32,
}

impl AppState {
    pub fn new(generator: Arc<dyn AudioGenerator>, output_dir: PathBuf, max_duration_sec: f32) -> Self {
        Self {
            generator,
            output_dir,
            max_duration_sec,
        }
    }
}

/// Builds the router. `/test` is only mounted in model mode.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/generate", post(handlers::generate));

    if state.generator.mode() == GeneratorMode::Model {
        router = router.route("/test", get(handlers::test_tone));
    }

    router.with_state(state)
}

/// Serves on an already bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(
        addr = ?addr,
        mode = state.generator.mode().as_str(),
        output_dir = %state.output_dir.display(),
        "audio generation service listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
