use crate::acquisition::AcquisitionError;
use crate::actions::ActionError;
use crate::ocr::OcrError;
use crate::state::StateError;
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to start the application: {message}")]
    Startup { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reject() -> AppResult<()> {
        let intake: Result<(), AcquisitionError> = Err(AcquisitionError::NoFile);
        intake?;
        Ok(())
    }

    #[test]
    fn module_errors_convert_transparently() {
        let err = reject().unwrap_err();
        assert!(matches!(err, AppError::Acquisition(AcquisitionError::NoFile)));
        assert_eq!(err.to_string(), "no file was provided");
    }
}
