use std::sync::Arc;

use proptest::prelude::*;

use snaptext::acquisition::{
    accept, is_accepted_mime_type, validate, AcquisitionError, AcquisitionSource, CandidateFile,
    ACCEPTED_MIME_TYPES, MAX_UPLOAD_BYTES,
};
use snaptext::clock::ManualClock;
use snaptext::ocr::{CancellationToken, OcrEngine, OcrProgress, OcrRequest, OcrResult};
use snaptext::state::RecognitionState;
use snaptext::workflow::{InlineSpawner, Workflow, WorkflowOptions};

const LIMIT: u64 = 4096;

fn accepted_mime() -> impl Strategy<Value = &'static str> {
    prop::sample::select(ACCEPTED_MIME_TYPES.to_vec())
}

fn rejected_mime() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "image/svg+xml",
        "image/tiff",
        "application/pdf",
        "text/plain",
        "video/mp4",
    ])
}

struct EchoEngine;

impl OcrEngine for EchoEngine {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn recognize(
        &self,
        _request: &OcrRequest,
        _progress: &mut dyn FnMut(OcrProgress),
        _cancel: &CancellationToken,
    ) -> OcrResult<String> {
        Ok("seed text".to_string())
    }
}

/// Default-configured workflow holding `seed.png` with a finished recognition.
fn seeded_workflow() -> Workflow {
    let mut workflow = Workflow::new(
        Arc::new(EchoEngine),
        Box::new(InlineSpawner),
        Arc::new(ManualClock::new()),
        WorkflowOptions::default(),
    );
    workflow
        .acquire(
            CandidateFile::new("seed.png", Some("image/png"), vec![1; 32]),
            AcquisitionSource::Drop,
        )
        .unwrap();
    workflow.start_recognition().unwrap();
    workflow.pump();
    workflow
}

#[test]
fn default_limit_is_exactly_ten_mebibytes() {
    let mut workflow = seeded_workflow();
    let at_limit = CandidateFile::new(
        "big.png",
        Some("image/png"),
        vec![0; MAX_UPLOAD_BYTES as usize],
    );
    let image = workflow
        .acquire(at_limit, AcquisitionSource::Picker)
        .expect("10 MiB is accepted");
    assert_eq!(image.size(), 10 * 1024 * 1024);

    let over = CandidateFile::new(
        "bigger.png",
        Some("image/png"),
        vec![0; MAX_UPLOAD_BYTES as usize + 1],
    );
    let result = workflow.acquire(over, AcquisitionSource::Picker);
    assert!(matches!(result, Err(AcquisitionError::TooLarge { .. })));
    assert_eq!(workflow.image().unwrap().file_name(), "big.png");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn rejected_candidates_leave_the_workflow_untouched(
        oversize in any::<bool>(),
        mime in rejected_mime(),
        extra in 1usize..4096,
    ) {
        let mut workflow = seeded_workflow();
        let revision = workflow.image_revision();
        let state = workflow.state().clone();

        let candidate = if oversize {
            CandidateFile::new(
                "huge.png",
                Some("image/png"),
                vec![0; MAX_UPLOAD_BYTES as usize + extra],
            )
        } else {
            CandidateFile::new("other.bin", Some(mime), vec![0; extra])
        };
        prop_assert!(workflow.acquire(candidate, AcquisitionSource::Drop).is_err());

        prop_assert_eq!(workflow.image().map(|image| image.file_name()), Some("seed.png"));
        prop_assert_eq!(workflow.image_revision(), revision);
        prop_assert_eq!(workflow.state(), &state);
        prop_assert_eq!(
            workflow.state(),
            &RecognitionState::Succeeded { text: "seed text".to_string() }
        );
    }
}

proptest! {
    #[test]
    fn files_within_limit_are_accepted(
        mime in accepted_mime(),
        size in 1usize..=LIMIT as usize,
        name in "[a-z]{1,12}\\.(png|jpg|gif|bmp|webp)",
    ) {
        let candidate = CandidateFile::new(name.clone(), Some(mime), vec![0xAB; size]);
        let image = accept(candidate, AcquisitionSource::Picker, LIMIT).unwrap();

        prop_assert_eq!(image.file_name(), name.as_str());
        prop_assert_eq!(image.size(), size as u64);
        prop_assert!(is_accepted_mime_type(image.mime_type()));
        let expected_prefix = format!("data:{};base64,", image.mime_type());
        prop_assert!(image.preview().starts_with(&expected_prefix));
    }

    #[test]
    fn oversize_files_are_rejected(
        mime in accepted_mime(),
        extra in 1usize..1024,
    ) {
        let size = LIMIT as usize + extra;
        let candidate = CandidateFile::new("big.png", Some(mime), vec![0; size]);
        let err = validate(&candidate, LIMIT).unwrap_err();
        let is_too_large = matches!(
            err,
            AcquisitionError::TooLarge { size: got, limit: LIMIT, .. } if got == size as u64
        );
        prop_assert!(is_too_large);
    }

    #[test]
    fn disallowed_types_are_rejected_regardless_of_size(
        mime in rejected_mime(),
        size in 1usize..=LIMIT as usize,
    ) {
        let candidate = CandidateFile::new("file.bin", Some(mime), vec![1; size]);
        let is_unsupported = matches!(
            validate(&candidate, LIMIT),
            Err(AcquisitionError::UnsupportedType { .. })
        );
        prop_assert!(is_unsupported);
    }

    #[test]
    fn mime_matching_ignores_case_and_parameters(
        mime in accepted_mime(),
        upper in any::<bool>(),
    ) {
        let decorated = if upper {
            format!("{}; charset=binary", mime.to_ascii_uppercase())
        } else {
            format!("{mime}; q=0.9")
        };
        prop_assert!(is_accepted_mime_type(&decorated));
    }
}
