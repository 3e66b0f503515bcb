use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::ocr::{CancellationToken, OcrEngine, OcrError, OcrProgress, OcrRequest, OcrResult};

/// Runs a recognition job somewhere off the host loop.
pub trait JobSpawner {
    fn spawn(&self, job: Box<dyn FnOnce() + Send + 'static>);
}

/// One worker thread per job.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl JobSpawner for ThreadSpawner {
    fn spawn(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        if let Err(err) = std::thread::Builder::new()
            .name("snaptext-ocr".to_string())
            .spawn(job)
        {
            // The dropped job reports itself as lost.
            tracing::error!(?err, "failed to spawn recognition worker");
        }
    }
}

/// Runs the job to completion on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineSpawner;

impl JobSpawner for InlineSpawner {
    fn spawn(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        job();
    }
}

#[derive(Debug)]
pub(crate) struct JobMessage {
    pub(crate) generation: u64,
    pub(crate) kind: JobMessageKind,
}

#[derive(Debug)]
pub(crate) enum JobMessageKind {
    Progress(OcrProgress),
    Finished(OcrResult<String>),
}

/// Guarantees exactly one `Finished` message per job, even when the engine
/// panics or the job is dropped before it runs.
struct Reporter {
    generation: u64,
    tx: Sender<JobMessage>,
    finished: bool,
}

impl Reporter {
    fn send(&self, kind: JobMessageKind) {
        // A closed channel means the workflow is gone; nobody is listening.
        let _ = self.tx.send(JobMessage {
            generation: self.generation,
            kind,
        });
    }

    fn finish(mut self, result: OcrResult<String>) {
        self.finished = true;
        self.send(JobMessageKind::Finished(result));
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if !self.finished {
            self.send(JobMessageKind::Finished(Err(OcrError::WorkerLost)));
        }
    }
}

pub(crate) fn recognition_job(
    engine: Arc<dyn OcrEngine>,
    request: OcrRequest,
    cancel: CancellationToken,
    generation: u64,
    tx: Sender<JobMessage>,
) -> Box<dyn FnOnce() + Send + 'static> {
    let reporter = Reporter {
        generation,
        tx,
        finished: false,
    };
    Box::new(move || {
        let span = tracing::debug_span!("recognition", generation, engine = engine.name());
        let _enter = span.enter();

        let result = match cancel.check() {
            Ok(()) => engine.recognize(
                &request,
                &mut |progress| reporter.send(JobMessageKind::Progress(progress)),
                &cancel,
            ),
            Err(err) => Err(err),
        };
        reporter.finish(result);
    })
}
