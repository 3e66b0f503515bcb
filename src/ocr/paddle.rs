//! PaddleOCR (PP-OCRv5 via MNN) engine adapter.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::DynamicImage;

use super::{
    CancellationToken, OcrEngine, OcrError, OcrLanguage, OcrProgress, OcrRequest, OcrResult,
    OcrStage,
};

const SYSTEM_MODEL_DIR: &str = "/usr/share/snaptext/models";
const DETECTION_MODEL: &str = "PP-OCRv5_mobile_det.mnn";

fn rec_model_filename(language: OcrLanguage) -> &'static str {
    match language {
        OcrLanguage::English => "en_PP-OCRv5_mobile_rec_infer.mnn",
        OcrLanguage::Korean => "korean_PP-OCRv5_mobile_rec_infer.mnn",
        OcrLanguage::Chinese => "PP-OCRv5_mobile_rec.mnn",
        OcrLanguage::Cyrillic => "cyrillic_PP-OCRv5_mobile_rec_infer.mnn",
        OcrLanguage::Arabic => "arabic_PP-OCRv5_mobile_rec_infer.mnn",
        OcrLanguage::Greek => "el_PP-OCRv5_mobile_rec_infer.mnn",
        OcrLanguage::Thai => "th_PP-OCRv5_mobile_rec_infer.mnn",
    }
}

fn keys_filename(language: OcrLanguage) -> &'static str {
    match language {
        OcrLanguage::English => "ppocr_keys_en.txt",
        OcrLanguage::Korean => "ppocr_keys_korean.txt",
        OcrLanguage::Chinese => "ppocr_keys_v5.txt",
        OcrLanguage::Cyrillic => "ppocr_keys_cyrillic.txt",
        OcrLanguage::Arabic => "ppocr_keys_arabic.txt",
        OcrLanguage::Greek => "ppocr_keys_el.txt",
        OcrLanguage::Thai => "ppocr_keys_th.txt",
    }
}

/// User data dir first, then the system-wide install location.
pub fn resolve_model_dir() -> Option<PathBuf> {
    let user_dir = std::env::var("XDG_DATA_HOME")
        .ok()
        .filter(|val| !val.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local/share"))
        })
        .map(|base| base.join("snaptext/models"));

    if let Some(dir) = user_dir.filter(|dir| dir.is_dir()) {
        return Some(dir);
    }

    let system_dir = PathBuf::from(SYSTEM_MODEL_DIR);
    system_dir.is_dir().then_some(system_dir)
}

fn create_engine(model_dir: &Path, language: OcrLanguage) -> OcrResult<ocr_rs::OcrEngine> {
    let det_path = model_dir.join(DETECTION_MODEL);
    let rec_path = model_dir.join(rec_model_filename(language));
    let keys_path = model_dir.join(keys_filename(language));

    ocr_rs::OcrEngine::new(
        det_path.to_str().unwrap_or_default(),
        rec_path.to_str().unwrap_or_default(),
        keys_path.to_str().unwrap_or_default(),
        None,
    )
    .map_err(|err| OcrError::EngineInit {
        message: err.to_string(),
    })
}

/// Lines are ordered top to bottom by their bounding box.
fn recognize_lines(engine: &ocr_rs::OcrEngine, image: &DynamicImage) -> OcrResult<String> {
    let results = engine.recognize(image).map_err(|err| OcrError::Recognition {
        message: err.to_string(),
    })?;

    let mut lines: Vec<_> = results
        .into_iter()
        .map(|r| (r.bbox.rect.top(), r.text))
        .collect();
    lines.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    Ok(lines
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Engine loaded lazily on the first request and kept per language.
pub struct PaddleEngine {
    model_dir: Option<PathBuf>,
    loaded: Mutex<Option<(OcrLanguage, ocr_rs::OcrEngine)>>,
}

impl PaddleEngine {
    pub fn new(model_dir: Option<PathBuf>) -> Self {
        Self {
            model_dir,
            loaded: Mutex::new(None),
        }
    }

    pub fn with_default_model_dir() -> Self {
        Self::new(resolve_model_dir())
    }

    pub fn model_dir(&self) -> Option<&Path> {
        self.model_dir.as_deref()
    }
}

impl OcrEngine for PaddleEngine {
    fn name(&self) -> &'static str {
        "paddle"
    }

    fn recognize(
        &self,
        request: &OcrRequest,
        progress: &mut dyn FnMut(OcrProgress),
        cancel: &CancellationToken,
    ) -> OcrResult<String> {
        let mut loaded = self
            .loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if loaded.as_ref().map(|(language, _)| *language) != Some(request.language) {
            progress(OcrProgress {
                stage: OcrStage::LoadingEngine,
                fraction: 0.0,
            });
            let model_dir = self.model_dir.as_deref().ok_or_else(|| OcrError::EngineInit {
                message: "model directory not found".to_string(),
            })?;
            tracing::info!(
                model_dir = %model_dir.display(),
                language = request.language.code(),
                "loading OCR models"
            );
            *loaded = Some((request.language, create_engine(model_dir, request.language)?));
        }
        cancel.check()?;

        progress(OcrProgress::recognizing(0.0));
        let image = image::load_from_memory(&request.image).map_err(|err| {
            OcrError::ImageDecode {
                message: err.to_string(),
            }
        })?;
        progress(OcrProgress::recognizing(0.2));
        cancel.check()?;

        let engine = loaded
            .as_ref()
            .map(|(_, engine)| engine)
            .ok_or_else(|| OcrError::EngineInit {
                message: "engine not loaded".to_string(),
            })?;
        let text = recognize_lines(engine, &image)?;
        cancel.check()?;
        progress(OcrProgress::recognizing(1.0));
        Ok(text)
    }
}
