//! End-to-end pipeline execution scenarios

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::{register_mock, MockSpec};
use geopipe::core::{PipelineState, StepState};
use geopipe::process::{ParameterKind, ParameterSpec, ProcessRegistry, TypedValue};
use geopipe::{PipelineFactory, UploadedFile};

const TWO_STEP_DOCUMENT: &str = r#"
processes:
  - id: "checker"
    implementation: "check"
  - id: "archiver"
    implementation: "archive"

pipelines:
  - id: "delivery"
    displayName:
      en: "Data delivery"
    parameters:
      uploadStep: "upload"
      fileMappings:
        - fileExtension: ".xtf"
          attribute: "transferFile"
    steps:
      - id: "check"
        processId: "checker"
        inputs:
          - from: "upload"
            take: "transferFile"
            as: "file"
        outputs:
          - take: "log"
            as: "checkLog"
            actions: ["download"]
      - id: "archive"
        processId: "archiver"
        inputs:
          - from: "check"
            take: "checkLog"
            as: "file"
        outputs:
          - take: "receipt"
            as: "receiptNo"
"#;

fn file_parameter() -> ParameterSpec {
    ParameterSpec::required("file", ParameterKind::String)
}

#[tokio::test]
async fn test_two_step_chain_succeeds() {
    let mut registry = ProcessRegistry::new();
    let check = register_mock(
        &mut registry,
        "check",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("log", TypedValue::String("check.log".to_string())),
    );
    let archive = register_mock(
        &mut registry,
        "archive",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("receipt", TypedValue::Int(42)),
    );

    let factory = PipelineFactory::from_yaml(TWO_STEP_DOCUMENT, Arc::new(registry)).unwrap();
    let mut pipeline = factory.create_pipeline("delivery").unwrap();
    assert_eq!(pipeline.state(), PipelineState::Pending);

    let context = pipeline
        .run(
            &UploadedFile::new("/uploads/delivery.xtf"),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(pipeline.state(), PipelineState::Success);
    for step in pipeline.steps() {
        assert!(step.state.is_success(), "step {} not successful", step.id);
    }

    // Context carries entries for the upload token and both steps, under
    // the declared published attribute names.
    assert_eq!(context.step_ids(), ["archive", "check", "upload"]);
    assert_eq!(
        context.value("check", "checkLog"),
        Some(&TypedValue::String("check.log".to_string()))
    );
    assert_eq!(context.value("archive", "receiptNo"), Some(&TypedValue::Int(42)));

    // The second step received the first step's published value.
    assert_eq!(
        archive.last_inputs().unwrap().get("file"),
        Some(&TypedValue::String("check.log".to_string()))
    );

    assert_eq!(check.invocation_count(), 1);
    assert_eq!(archive.invocation_count(), 1);
}

#[tokio::test]
async fn test_failing_process_fails_step_and_stops_pipeline() {
    let mut registry = ProcessRegistry::new();
    let check = register_mock(
        &mut registry,
        "check",
        MockSpec::default()
            .with_parameter(file_parameter())
            .failing("validation service unavailable"),
    );
    let archive = register_mock(
        &mut registry,
        "archive",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("receipt", TypedValue::Int(42)),
    );

    let factory = PipelineFactory::from_yaml(TWO_STEP_DOCUMENT, Arc::new(registry)).unwrap();
    let mut pipeline = factory.create_pipeline("delivery").unwrap();

    let context = pipeline
        .run(
            &UploadedFile::new("/uploads/delivery.xtf"),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(pipeline.state(), PipelineState::Failed);

    // The failing step still has an (empty) entry in the context; nothing
    // is thrown past Pipeline::run.
    assert!(context.contains("check"));
    assert!(context.result("check").unwrap().is_empty());

    let states: Vec<&StepState> = pipeline.steps().iter().map(|s| &s.state).collect();
    assert!(states[0].is_failed());
    assert!(states[1].is_pending(), "later step must not have run");

    assert_eq!(check.invocation_count(), 1);
    assert_eq!(archive.invocation_count(), 0);
}

#[tokio::test]
async fn test_missing_declared_output_fails_step() {
    let mut registry = ProcessRegistry::new();
    // Succeeds but does not produce the declared "log" output.
    let check = register_mock(
        &mut registry,
        "check",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("unrelated", TypedValue::Bool(true)),
    );
    register_mock(
        &mut registry,
        "archive",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("receipt", TypedValue::Int(42)),
    );

    let factory = PipelineFactory::from_yaml(TWO_STEP_DOCUMENT, Arc::new(registry)).unwrap();
    let mut pipeline = factory.create_pipeline("delivery").unwrap();

    let context = pipeline
        .run(
            &UploadedFile::new("/uploads/delivery.xtf"),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(check.invocation_count(), 1);
    assert!(pipeline.steps()[0].state.is_failed());
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(context.result("check").unwrap().is_empty());
}

#[tokio::test]
async fn test_unmatched_upload_extension_fails_dependent_step() {
    let mut registry = ProcessRegistry::new();
    let check = register_mock(
        &mut registry,
        "check",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("log", TypedValue::String("check.log".to_string())),
    );
    register_mock(
        &mut registry,
        "archive",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("receipt", TypedValue::Int(42)),
    );

    let factory = PipelineFactory::from_yaml(TWO_STEP_DOCUMENT, Arc::new(registry)).unwrap();
    let mut pipeline = factory.create_pipeline("delivery").unwrap();

    pipeline
        .run(
            &UploadedFile::new("/uploads/delivery.zip"),
            CancellationToken::new(),
        )
        .await;

    // The upload seed is empty, so the first binding cannot resolve.
    assert!(pipeline.steps()[0].state.is_failed());
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(check.invocation_count(), 0);
}

#[tokio::test]
async fn test_cancellation_resolves_to_terminal_states() {
    let mut registry = ProcessRegistry::new();
    register_mock(
        &mut registry,
        "check",
        MockSpec::default()
            .with_parameter(file_parameter())
            .waiting_for_cancel(),
    );
    let archive = register_mock(
        &mut registry,
        "archive",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("receipt", TypedValue::Int(42)),
    );

    let factory = PipelineFactory::from_yaml(TWO_STEP_DOCUMENT, Arc::new(registry)).unwrap();
    let mut pipeline = factory.create_pipeline("delivery").unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    pipeline
        .run(&UploadedFile::new("/uploads/delivery.xtf"), cancel)
        .await;

    // The cancelled step fails rather than hangs, and the pipeline does
    // not proceed to later steps.
    assert!(pipeline.steps()[0].state.is_failed());
    assert!(pipeline.steps()[1].state.is_pending());
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(archive.invocation_count(), 0);
}

#[tokio::test]
async fn test_already_cancelled_token_skips_process_invocation() {
    let mut registry = ProcessRegistry::new();
    let check = register_mock(
        &mut registry,
        "check",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("log", TypedValue::String("check.log".to_string())),
    );
    register_mock(
        &mut registry,
        "archive",
        MockSpec::default()
            .with_parameter(file_parameter())
            .with_output("receipt", TypedValue::Int(42)),
    );

    let factory = PipelineFactory::from_yaml(TWO_STEP_DOCUMENT, Arc::new(registry)).unwrap();
    let mut pipeline = factory.create_pipeline("delivery").unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    pipeline
        .run(&UploadedFile::new("/uploads/delivery.xtf"), cancel)
        .await;

    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(check.invocation_count(), 0);
}

#[tokio::test]
async fn test_empty_pipeline_stays_pending() {
    let yaml = r#"
pipelines:
  - id: "noop"
    parameters:
      uploadStep: "upload"
      fileMappings:
        - fileExtension: ".xtf"
          attribute: "transferFile"
"#;
    let factory = PipelineFactory::from_yaml(yaml, Arc::new(ProcessRegistry::new())).unwrap();
    let mut pipeline = factory.create_pipeline("noop").unwrap();

    let context = pipeline
        .run(
            &UploadedFile::new("/uploads/delivery.xtf"),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(pipeline.state(), PipelineState::Pending);
    assert!(context.contains("upload"));
}
