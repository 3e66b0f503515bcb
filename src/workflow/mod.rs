//! The single image-to-text workflow instance.
//!
//! [`Workflow`] owns the current image, the recognition state machine, the
//! toast collection and the bookkeeping for the one in-flight recognition
//! job. The host loop calls [`Workflow::tick`] periodically; everything else
//! is driven by user actions.
//!
//! Each job is tagged with a generation. Clearing or replacing the image
//! cancels the job's token and bumps the generation, so anything the old job
//! still reports is dropped on arrival.

mod job;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use crate::acquisition::{
    self, AcquisitionError, AcquisitionResult, AcquisitionSource, CandidateFile, ClipboardItem,
    UploadedImage,
};
use crate::clock::Clock;
use crate::config::{AppConfig, RejectionFeedback};
use crate::notification::{NotificationCenter, Severity};
use crate::ocr::{
    resolve_ocr_language, CancellationToken, OcrEngine, OcrLanguage, OcrRequest, OcrStage,
};
use crate::state::{RecognitionState, StateMachine, StateTransition, WorkflowEvent};

pub use job::{InlineSpawner, JobSpawner, ThreadSpawner};
use job::{recognition_job, JobMessage, JobMessageKind};

pub const RECOGNITION_FAILED_MESSAGE: &str =
    "Failed to extract text from image. Please try again.";
pub const RECOGNITION_FAILED_TOAST: &str = "Failed to extract text from image";
pub const RECOGNITION_SUCCEEDED_TOAST: &str = "Text extracted successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowOptions {
    pub language: OcrLanguage,
    pub max_upload_bytes: u64,
    pub rejection_feedback: RejectionFeedback,
    pub toast_duration: Duration,
}

impl WorkflowOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            language: resolve_ocr_language(config.ocr_language.as_deref()),
            max_upload_bytes: config.max_upload_bytes(),
            rejection_feedback: config.rejection_feedback,
            toast_duration: config.toast_duration(),
        }
    }
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Handle of a started recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

#[derive(Debug)]
struct ActiveJob {
    id: JobId,
    cancel: CancellationToken,
}

pub struct Workflow {
    machine: StateMachine,
    image: Option<UploadedImage>,
    image_revision: u64,
    notifications: NotificationCenter,
    engine: Arc<dyn OcrEngine>,
    spawner: Box<dyn JobSpawner>,
    options: WorkflowOptions,
    generation: u64,
    active: Option<ActiveJob>,
    tx: Sender<JobMessage>,
    rx: Receiver<JobMessage>,
}

impl Workflow {
    pub fn new(
        engine: Arc<dyn OcrEngine>,
        spawner: Box<dyn JobSpawner>,
        clock: Arc<dyn Clock>,
        options: WorkflowOptions,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            machine: StateMachine::new(),
            image: None,
            image_revision: 0,
            notifications: NotificationCenter::with_duration(clock, options.toast_duration),
            engine,
            spawner,
            options,
            generation: 0,
            active: None,
            tx,
            rx,
        }
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    /// Bumped whenever the image is replaced or cleared.
    pub fn image_revision(&self) -> u64 {
        self.image_revision
    }

    pub fn state(&self) -> &RecognitionState {
        self.machine.state()
    }

    pub fn progress(&self) -> u8 {
        self.machine.state().progress()
    }

    pub fn is_processing(&self) -> bool {
        self.machine.state().is_processing()
    }

    pub fn result_text(&self) -> Option<&str> {
        self.machine.state().text()
    }

    /// Inline error shown until the next acquisition or clear.
    pub fn error_message(&self) -> Option<&str> {
        self.machine.state().error_message()
    }

    pub fn can_start_recognition(&self) -> bool {
        self.image.is_some() && !self.is_processing()
    }

    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.machine.history()
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.notifications
    }

    /// Validates `candidate` and makes it the current image.
    ///
    /// On rejection the current image and state are left untouched.
    pub fn acquire(
        &mut self,
        candidate: CandidateFile,
        source: AcquisitionSource,
    ) -> AcquisitionResult<&UploadedImage> {
        let name = candidate.name.clone();
        match acquisition::accept(candidate, source, self.options.max_upload_bytes) {
            Ok(image) => {
                tracing::info!(
                    source = source.as_str(),
                    file_name = image.file_name(),
                    mime_type = image.mime_type(),
                    size = image.size(),
                    "image acquired"
                );
                self.supersede_active_job();
                self.reset_state();
                self.image_revision += 1;
                Ok(self.image.insert(image))
            }
            Err(err) => Err(self.reject(source, &name, err)),
        }
    }

    pub fn acquire_dropped(
        &mut self,
        files: Vec<CandidateFile>,
    ) -> AcquisitionResult<&UploadedImage> {
        match acquisition::select_dropped(files) {
            Ok(candidate) => self.acquire(candidate, AcquisitionSource::Drop),
            Err(err) => Err(self.reject(AcquisitionSource::Drop, "", err)),
        }
    }

    /// Drop of file paths: the count is checked before any file is read.
    pub fn acquire_dropped_paths(
        &mut self,
        paths: Vec<PathBuf>,
    ) -> AcquisitionResult<&UploadedImage> {
        match acquisition::select_dropped(paths) {
            Ok(path) => self.acquire_path(&path, AcquisitionSource::Drop),
            Err(err) => Err(self.reject(AcquisitionSource::Drop, "", err)),
        }
    }

    pub fn acquire_picked(&mut self, path: &Path) -> AcquisitionResult<&UploadedImage> {
        self.acquire_path(path, AcquisitionSource::Picker)
    }

    fn acquire_path(
        &mut self,
        path: &Path,
        source: AcquisitionSource,
    ) -> AcquisitionResult<&UploadedImage> {
        match CandidateFile::from_path(path, self.options.max_upload_bytes) {
            Ok(candidate) => self.acquire(candidate, source),
            Err(err) => {
                let name = path.display().to_string();
                Err(self.reject(source, &name, err))
            }
        }
    }

    /// Returns `Ok(false)` when the paste carried no image.
    pub fn acquire_pasted(&mut self, items: Vec<ClipboardItem>) -> AcquisitionResult<bool> {
        let Some(candidate) = acquisition::select_pasted(items) else {
            tracing::debug!("paste without image content ignored");
            return Ok(false);
        };
        self.acquire(candidate, AcquisitionSource::Paste).map(|_| true)
    }

    /// Starts recognizing the current image. A no-op returning `None` when
    /// there is no image or a recognition is already running.
    pub fn start_recognition(&mut self) -> Option<JobId> {
        if self.is_processing() {
            tracing::debug!("recognition already running; start ignored");
            return None;
        }
        let Some(image) = &self.image else {
            tracing::debug!("no image to recognize; start ignored");
            return None;
        };
        let request = OcrRequest {
            image: image.shared_data(),
            language: self.options.language,
        };

        self.supersede_active_job();
        self.transition(WorkflowEvent::Start);

        let id = JobId(self.generation);
        let cancel = CancellationToken::new();
        self.active = Some(ActiveJob {
            id,
            cancel: cancel.clone(),
        });
        tracing::info!(
            job = id.0,
            engine = self.engine.name(),
            language = request.language.code(),
            "starting recognition"
        );

        let job = recognition_job(
            Arc::clone(&self.engine),
            request,
            cancel,
            id.0,
            self.tx.clone(),
        );
        self.spawner.spawn(job);
        Some(id)
    }

    /// Drops the image, result, error and progress. A running job is
    /// cancelled and whatever it still reports is ignored.
    pub fn clear(&mut self) {
        tracing::info!(state = self.state().name(), "clearing workflow");
        self.supersede_active_job();
        self.image = None;
        self.image_revision += 1;
        self.reset_state();
    }

    /// Applies every pending job message; returns how many were current.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if self.apply(message) {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                // The workflow keeps its own sender alive.
                Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// One host-loop iteration: job messages, then toast expiry.
    pub fn tick(&mut self) {
        self.pump();
        self.notifications.expire_due();
    }

    fn apply(&mut self, message: JobMessage) -> bool {
        let current = self
            .active
            .as_ref()
            .is_some_and(|job| job.id.0 == message.generation);
        if !current {
            tracing::debug!(
                generation = message.generation,
                "discarding message from superseded recognition"
            );
            return false;
        }

        match message.kind {
            JobMessageKind::Progress(progress) => {
                if progress.stage == OcrStage::Recognizing {
                    self.transition(WorkflowEvent::Progress(progress.percent()));
                } else {
                    tracing::debug!(stage = progress.stage.label(), "recognition stage");
                }
            }
            JobMessageKind::Finished(Ok(text)) => {
                self.active = None;
                tracing::info!(chars = text.chars().count(), "recognition finished");
                self.transition(WorkflowEvent::Complete(text));
                self.notifications.push(RECOGNITION_SUCCEEDED_TOAST, Severity::Success);
            }
            JobMessageKind::Finished(Err(err)) => {
                self.active = None;
                tracing::error!(%err, "OCR error");
                self.transition(WorkflowEvent::Fail(RECOGNITION_FAILED_MESSAGE.to_string()));
                self.notifications.push(RECOGNITION_FAILED_TOAST, Severity::Error);
            }
        }
        true
    }

    fn reject(
        &mut self,
        source: AcquisitionSource,
        name: &str,
        err: AcquisitionError,
    ) -> AcquisitionError {
        tracing::info!(source = source.as_str(), name, %err, "image rejected");
        if self.options.rejection_feedback == RejectionFeedback::Notify {
            self.notifications.push(err.user_message(), Severity::Warning);
        }
        err
    }

    fn supersede_active_job(&mut self) {
        if let Some(job) = self.active.take() {
            tracing::debug!(job = job.id.0, "cancelling superseded recognition");
            job.cancel.cancel();
        }
        self.generation += 1;
    }

    fn reset_state(&mut self) {
        if *self.machine.state() != RecognitionState::Idle {
            self.transition(WorkflowEvent::Reset);
        }
    }

    fn transition(&mut self, event: WorkflowEvent) {
        // Rejections are logged by the machine; the workflow stays where it is.
        let _ = self.machine.transition(event);
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("state", self.machine.state())
            .field("image", &self.image)
            .field("generation", &self.generation)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
