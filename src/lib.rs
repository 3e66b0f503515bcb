pub mod acquisition;
pub mod actions;
#[cfg(feature = "gui")]
pub mod app;
pub mod bootstrap;
pub mod clipboard;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod notification;
pub mod ocr;
pub mod state;
pub mod storage;
pub mod workflow;
pub use error::{AppError, AppResult};

/// Entrypoint used by the desktop binary.
#[cfg(all(feature = "gui", feature = "paddle"))]
pub fn run() -> AppResult<()> {
    use std::sync::Arc;

    logging::init();
    tracing::info!("starting SnapText");

    let engine = Arc::new(ocr::paddle::PaddleEngine::with_default_model_dir());
    match engine.model_dir() {
        Some(dir) => tracing::info!(model_dir = %dir.display(), "using OCR models"),
        None => tracing::warn!("no OCR model directory found; recognition will fail"),
    }
    app::run(engine)?;

    tracing::info!("SnapText exited");
    Ok(())
}
