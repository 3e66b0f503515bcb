//! Image intake from drop, picker and paste sources.
//!
//! Validation is the same for every source: the MIME type (declared, or
//! inferred from the file extension) must be one of the accepted raster
//! formats and the payload must be non-empty and within the size limit.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;
use thiserror::Error;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const PASTED_IMAGE_NAME: &str = "pasted-image.png";

/// MIME types offered to file pickers.
pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/bmp",
    "image/webp",
];

/// Display labels for the accepted formats.
pub const ACCEPTED_FORMAT_LABELS: [&str; 6] = ["PNG", "JPG", "JPEG", "GIF", "BMP", "WEBP"];

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("unsupported image type {mime_type}")]
    UnsupportedType { mime_type: String },
    #[error("cannot determine image type of {name}")]
    UnknownType { name: String },
    #[error("image {name} is {size} bytes, limit is {limit}")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("image {name} is empty")]
    Empty { name: String },
    #[error("expected a single image, got {count}")]
    MultipleFiles { count: usize },
    #[error("no file was provided")]
    NoFile,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AcquisitionError {
    /// Short text suitable for a warning toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedType { .. } | Self::UnknownType { .. } => format!(
                "Unsupported file type. Use {}",
                ACCEPTED_FORMAT_LABELS.join(", ")
            ),
            Self::TooLarge { limit, .. } => {
                format!("Image is too large (max {} MB)", limit / (1024 * 1024))
            }
            Self::Empty { .. } => "Image file is empty".to_string(),
            Self::MultipleFiles { .. } => "Drop a single image at a time".to_string(),
            Self::NoFile => "No image was provided".to_string(),
            Self::Read { .. } => "Could not read the selected file".to_string(),
        }
    }
}

pub type AcquisitionResult<T> = std::result::Result<T, AcquisitionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionSource {
    Drop,
    Picker,
    Paste,
}

impl AcquisitionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Picker => "picker",
            Self::Paste => "paste",
        }
    }
}

/// A not-yet-validated file handed over by one of the input sources.
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(str::to_string),
            data,
        }
    }

    /// Reads a file from disk; the MIME type is inferred from the extension.
    ///
    /// Files whose metadata already exceeds `max_bytes` are rejected without
    /// being opened, and at most `max_bytes + 1` bytes are ever read.
    pub fn from_path(path: &Path, max_bytes: u64) -> AcquisitionResult<Self> {
        let read_error = |source| AcquisitionError::Read {
            path: path.to_path_buf(),
            source,
        };
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let size = std::fs::metadata(path).map_err(read_error)?.len();
        if size > max_bytes {
            return Err(AcquisitionError::TooLarge {
                name,
                size,
                limit: max_bytes,
            });
        }

        let file = File::open(path).map_err(read_error)?;
        let data = read_limited(file, &name, max_bytes).map_err(|err| match err {
            LimitedRead::Io(source) => read_error(source),
            LimitedRead::TooLarge(err) => err,
        })?;
        Ok(Self {
            name,
            mime_type: None,
            data,
        })
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// One entry of a clipboard paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// The image the workflow currently operates on. Never mutated; a new
/// acquisition replaces it wholesale.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    data: Arc<[u8]>,
    preview: String,
    file_name: String,
    mime_type: String,
    source: AcquisitionSource,
}

impl UploadedImage {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// `data:` URL of the original bytes, computed once at acquisition.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> AcquisitionSource {
        self.source
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("source", &self.source)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Validates `candidate` and turns it into an [`UploadedImage`].
pub fn accept(
    candidate: CandidateFile,
    source: AcquisitionSource,
    max_bytes: u64,
) -> AcquisitionResult<UploadedImage> {
    let mime_type = validate(&candidate, max_bytes)?;
    let preview = preview_data_url(&mime_type, &candidate.data);
    Ok(UploadedImage {
        data: Arc::from(candidate.data),
        preview,
        file_name: candidate.name,
        mime_type,
        source,
    })
}

/// Returns the normalized MIME type when the candidate is acceptable.
pub fn validate(candidate: &CandidateFile, max_bytes: u64) -> AcquisitionResult<String> {
    let mime_type = resolve_mime_type(candidate)?;
    if !is_accepted_mime_type(&mime_type) {
        return Err(AcquisitionError::UnsupportedType { mime_type });
    }
    if candidate.data.is_empty() {
        return Err(AcquisitionError::Empty {
            name: candidate.name.clone(),
        });
    }
    if candidate.size() > max_bytes {
        return Err(AcquisitionError::TooLarge {
            name: candidate.name.clone(),
            size: candidate.size(),
            limit: max_bytes,
        });
    }
    Ok(mime_type)
}

/// A drop target takes exactly one file. Works on paths as well as on loaded
/// candidates, so a multi-file drop is rejected before anything is read.
pub fn select_dropped<T>(mut files: Vec<T>) -> AcquisitionResult<T> {
    match files.len() {
        0 => Err(AcquisitionError::NoFile),
        1 => Ok(files.remove(0)),
        count => Err(AcquisitionError::MultipleFiles { count }),
    }
}

/// Picks the first image entry of a paste, if any.
pub fn select_pasted(items: Vec<ClipboardItem>) -> Option<CandidateFile> {
    items
        .into_iter()
        .find(|item| item.mime_type.to_ascii_lowercase().contains("image"))
        .map(|item| CandidateFile {
            name: PASTED_IMAGE_NAME.to_string(),
            mime_type: Some(item.mime_type),
            data: item.data,
        })
}

pub fn is_accepted_mime_type(mime_type: &str) -> bool {
    let normalized = normalize_mime_type(mime_type);
    ACCEPTED_MIME_TYPES.contains(&normalized.as_str())
}

enum LimitedRead {
    Io(io::Error),
    TooLarge(AcquisitionError),
}

/// Reads at most `max_bytes + 1` bytes; one byte over the limit is enough to
/// reject a file that grew after its metadata was checked.
fn read_limited(reader: impl Read, name: &str, max_bytes: u64) -> Result<Vec<u8>, LimitedRead> {
    let mut data = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut data)
        .map_err(LimitedRead::Io)?;
    let size = data.len() as u64;
    if size > max_bytes {
        return Err(LimitedRead::TooLarge(AcquisitionError::TooLarge {
            name: name.to_string(),
            size,
            limit: max_bytes,
        }));
    }
    Ok(data)
}

fn resolve_mime_type(candidate: &CandidateFile) -> AcquisitionResult<String> {
    if let Some(declared) = candidate
        .mime_type
        .as_deref()
        .filter(|mime| !mime.trim().is_empty())
    {
        return Ok(normalize_mime_type(declared));
    }

    let format =
        ImageFormat::from_path(&candidate.name).map_err(|_| AcquisitionError::UnknownType {
            name: candidate.name.clone(),
        })?;
    Ok(format.to_mime_type().to_string())
}

fn normalize_mime_type(mime_type: &str) -> String {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-ms-bmp" | "image/x-bmp" => "image/bmp".to_string(),
        _ => essence,
    }
}

fn preview_data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str, size: usize) -> CandidateFile {
        CandidateFile::new(name, Some("image/png"), vec![0x89; size])
    }

    #[test]
    fn accept_keeps_file_name_and_builds_preview() {
        let image = accept(png("scan.png", 16), AcquisitionSource::Drop, MAX_UPLOAD_BYTES)
            .expect("png accepted");

        assert_eq!(image.file_name(), "scan.png");
        assert_eq!(image.mime_type(), "image/png");
        assert!(image.preview().starts_with("data:image/png;base64,"));
        assert_eq!(image.size(), 16);
    }

    #[test]
    fn size_limit_is_inclusive() {
        let limit = 64;
        assert!(validate(&png("a.png", 64), limit).is_ok());
        assert!(matches!(
            validate(&png("a.png", 65), limit),
            Err(AcquisitionError::TooLarge {
                size: 65,
                limit: 64,
                ..
            })
        ));
    }

    #[test]
    fn rejects_unsupported_and_empty_files() {
        let tiff = CandidateFile::new("a.tiff", Some("image/tiff"), vec![1]);
        assert!(matches!(
            validate(&tiff, MAX_UPLOAD_BYTES),
            Err(AcquisitionError::UnsupportedType { .. })
        ));

        let pdf = CandidateFile::new("a.pdf", Some("application/pdf"), vec![1]);
        assert!(validate(&pdf, MAX_UPLOAD_BYTES).is_err());

        assert!(matches!(
            validate(&png("empty.png", 0), MAX_UPLOAD_BYTES),
            Err(AcquisitionError::Empty { .. })
        ));
    }

    #[test]
    fn mime_type_falls_back_to_extension() {
        let jpeg = CandidateFile::new("photo.JPG", None, vec![1, 2, 3]);
        assert_eq!(validate(&jpeg, MAX_UPLOAD_BYTES).unwrap(), "image/jpeg");

        let webp = CandidateFile::new("sticker.webp", Some(""), vec![1]);
        assert_eq!(validate(&webp, MAX_UPLOAD_BYTES).unwrap(), "image/webp");

        let unknown = CandidateFile::new("notes", None, vec![1]);
        assert!(matches!(
            validate(&unknown, MAX_UPLOAD_BYTES),
            Err(AcquisitionError::UnknownType { .. })
        ));
    }

    #[test]
    fn mime_aliases_are_normalized() {
        assert!(is_accepted_mime_type("image/jpg"));
        assert!(is_accepted_mime_type("IMAGE/PNG; charset=binary"));
        assert!(is_accepted_mime_type("image/x-ms-bmp"));
        assert!(!is_accepted_mime_type("image/svg+xml"));
    }

    #[test]
    fn drop_accepts_exactly_one_file() {
        assert!(matches!(select_dropped(Vec::<CandidateFile>::new()), Err(AcquisitionError::NoFile)));
        assert_eq!(select_dropped(vec![png("a.png", 1)]).unwrap().name, "a.png");
        assert!(matches!(
            select_dropped(vec![png("a.png", 1), png("b.png", 1)]),
            Err(AcquisitionError::MultipleFiles { count: 2 })
        ));
    }

    #[test]
    fn paste_takes_first_image_item() {
        let items = vec![
            ClipboardItem {
                mime_type: "text/plain".to_string(),
                data: b"hello".to_vec(),
            },
            ClipboardItem {
                mime_type: "image/png".to_string(),
                data: vec![1, 2],
            },
            ClipboardItem {
                mime_type: "image/jpeg".to_string(),
                data: vec![3],
            },
        ];
        let candidate = select_pasted(items).expect("image item");
        assert_eq!(candidate.name, PASTED_IMAGE_NAME);
        assert_eq!(candidate.mime_type.as_deref(), Some("image/png"));
        assert_eq!(candidate.data, vec![1, 2]);
    }

    #[test]
    fn paste_without_image_yields_nothing() {
        let items = vec![ClipboardItem {
            mime_type: "text/html".to_string(),
            data: b"<p>x</p>".to_vec(),
        }];
        assert!(select_pasted(items).is_none());
    }

    #[test]
    fn from_path_reads_file_and_name() {
        let path = std::env::temp_dir().join("snaptext-acquire-test.png");
        std::fs::write(&path, b"png-bytes").unwrap();

        let candidate = CandidateFile::from_path(&path, MAX_UPLOAD_BYTES).expect("readable");
        assert_eq!(candidate.name, "snaptext-acquire-test.png");
        assert_eq!(candidate.data, b"png-bytes");
        assert!(candidate.mime_type.is_none());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = CandidateFile::from_path(Path::new("/nonexistent/snaptext.png"), MAX_UPLOAD_BYTES)
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::Read { .. }));
    }

    #[test]
    fn from_path_rejects_oversize_file_from_metadata() {
        let path = std::env::temp_dir().join(format!(
            "snaptext-sparse-{}.png",
            std::process::id()
        ));
        let file = File::create(&path).unwrap();
        file.set_len(200 * 1024 * 1024).unwrap();
        drop(file);

        let err = CandidateFile::from_path(&path, MAX_UPLOAD_BYTES).unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::TooLarge { size, limit: MAX_UPLOAD_BYTES, .. }
                if size == 200 * 1024 * 1024
        ));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn from_path_accepts_file_at_the_limit() {
        let path = std::env::temp_dir().join(format!(
            "snaptext-at-limit-{}.png",
            std::process::id()
        ));
        std::fs::write(&path, vec![7u8; 64]).unwrap();

        let candidate = CandidateFile::from_path(&path, 64).expect("at the limit");
        assert_eq!(candidate.size(), 64);
        assert!(matches!(
            CandidateFile::from_path(&path, 63),
            Err(AcquisitionError::TooLarge { size: 64, limit: 63, .. })
        ));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn read_limited_stops_one_byte_past_the_limit() {
        let endless = io::repeat(0xAB);
        match read_limited(endless, "stream.png", 16) {
            Err(LimitedRead::TooLarge(AcquisitionError::TooLarge { size, limit, .. })) => {
                assert_eq!((size, limit), (17, 16));
            }
            _ => panic!("unbounded reader must be cut off"),
        }

        let exact = read_limited(io::Cursor::new(vec![1u8; 16]), "exact.png", 16);
        assert!(matches!(exact, Ok(data) if data.len() == 16));
    }

    #[test]
    fn drop_selection_works_on_paths() {
        let paths = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        assert!(matches!(
            select_dropped(paths),
            Err(AcquisitionError::MultipleFiles { count: 2 })
        ));
        assert_eq!(
            select_dropped(vec![PathBuf::from("a.png")]).unwrap(),
            PathBuf::from("a.png")
        );
    }

    #[test]
    fn user_message_mentions_limit() {
        let err = AcquisitionError::TooLarge {
            name: "big.png".to_string(),
            size: MAX_UPLOAD_BYTES + 1,
            limit: MAX_UPLOAD_BYTES,
        };
        assert_eq!(err.user_message(), "Image is too large (max 10 MB)");
    }
}
