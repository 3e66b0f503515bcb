//! Boundary to the external text-recognition engine.
//!
//! The workflow only sees [`OcrEngine`]: raw image bytes and a language go
//! in, text comes out, and progress is reported through a callback while the
//! engine runs on a worker thread.

#[cfg(feature = "paddle")]
pub mod paddle;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("engine initialization failed: {message}")]
    EngineInit { message: String },
    #[error("image decoding failed: {message}")]
    ImageDecode { message: String },
    #[error("recognition failed: {message}")]
    Recognition { message: String },
    #[error("recognition was cancelled")]
    Cancelled,
    #[error("recognition worker stopped without a result")]
    WorkerLost,
}

pub type OcrResult<T> = Result<T, OcrError>;

/// Supported recognition languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrLanguage {
    #[default]
    English,
    Korean,
    Chinese,
    Cyrillic,
    Arabic,
    Greek,
    Thai,
}

impl OcrLanguage {
    /// Three-letter language code passed to engines.
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "eng",
            Self::Korean => "kor",
            Self::Chinese => "chi_sim",
            Self::Cyrillic => "rus",
            Self::Arabic => "ara",
            Self::Greek => "ell",
            Self::Thai => "tha",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Korean => "Korean",
            Self::Chinese => "Chinese",
            Self::Cyrillic => "Cyrillic",
            Self::Arabic => "Arabic",
            Self::Greek => "Greek",
            Self::Thai => "Thai",
        }
    }
}

/// Parse a config value into an [`OcrLanguage`]; unknown values yield `None`.
pub fn parse_ocr_language(value: &str) -> Option<OcrLanguage> {
    match value.trim().to_ascii_lowercase().as_str() {
        "eng" | "en" | "english" => Some(OcrLanguage::English),
        "kor" | "ko" | "korean" => Some(OcrLanguage::Korean),
        "chi_sim" | "zh" | "chinese" => Some(OcrLanguage::Chinese),
        "rus" | "ru" | "cyrillic" => Some(OcrLanguage::Cyrillic),
        "ara" | "ar" | "arabic" => Some(OcrLanguage::Arabic),
        "ell" | "el" | "greek" => Some(OcrLanguage::Greek),
        "tha" | "th" | "thai" => Some(OcrLanguage::Thai),
        _ => None,
    }
}

/// Resolve the configured language, defaulting to English.
pub fn resolve_ocr_language(config_value: Option<&str>) -> OcrLanguage {
    match config_value {
        Some(value) => parse_ocr_language(value).unwrap_or_else(|| {
            tracing::warn!(value, "unknown OCR language in config; using English");
            OcrLanguage::English
        }),
        None => OcrLanguage::English,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrStage {
    LoadingEngine,
    Recognizing,
}

impl OcrStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadingEngine => "loading engine",
            Self::Recognizing => "recognizing text",
        }
    }
}

/// Progress report from an engine; `fraction` is in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcrProgress {
    pub stage: OcrStage,
    pub fraction: f32,
}

impl OcrProgress {
    pub fn recognizing(fraction: f32) -> Self {
        Self {
            stage: OcrStage::Recognizing,
            fraction,
        }
    }

    pub fn percent(self) -> u8 {
        if self.fraction.is_nan() {
            return 0;
        }
        (self.fraction.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Shared flag telling an engine to abandon its work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn check(&self) -> OcrResult<()> {
        if self.is_cancelled() {
            Err(OcrError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub image: Arc<[u8]>,
    pub language: OcrLanguage,
}

pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(
        &self,
        request: &OcrRequest,
        progress: &mut dyn FnMut(OcrProgress),
        cancel: &CancellationToken,
    ) -> OcrResult<String>;
}
