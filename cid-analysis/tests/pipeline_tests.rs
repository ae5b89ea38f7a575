//! Analysis pipeline integration tests
//!
//! Drives the orchestrator against stub prediction and storage backends:
//! submission sequencing, health gating, error surfacing, single-flight
//! enforcement, and non-fatal persistence.

mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cid_analysis::db;
use cid_analysis::error::{AnalysisError, ApiError};
use cid_analysis::models::{AnalysisStage, ColonyAge, ConfidenceLevel, SubmissionState};
use cid_analysis::services::{AnalysisOrchestrator, PredictionClient, StorageClient};
use helpers::{spawn_predict_stub, spawn_storage_stub, stub_storage_config};

struct TestEnv {
    orchestrator: AnalysisOrchestrator,
    pool: sqlx::SqlitePool,
    predict_stub: Arc<helpers::PredictStub>,
    storage_stub: Arc<helpers::StorageStub>,
    tmp: tempfile::TempDir,
}

async fn test_env() -> TestEnv {
    let (predict_url, predict_stub) = spawn_predict_stub().await;
    let (storage_url, storage_stub) = spawn_storage_stub().await;

    let tmp = tempfile::TempDir::new().unwrap();
    let pool = db::init_database_pool(&tmp.path().join("colonyid.db"))
        .await
        .unwrap();

    let orchestrator = AnalysisOrchestrator::new(
        Arc::new(PredictionClient::new(predict_url).unwrap()),
        Arc::new(StorageClient::new(stub_storage_config(&storage_url)).unwrap()),
        pool.clone(),
    );

    TestEnv {
        orchestrator,
        pool,
        predict_stub,
        storage_stub,
        tmp,
    }
}

/// Walk a fresh session's draft to READY through every stage gate
async fn ready_session(env: &TestEnv) -> uuid::Uuid {
    let session = env.orchestrator.create_session("tech-1".to_string()).await;
    let id = session.session_id;

    env.orchestrator
        .toggle_characteristic(id, "Gram Negative bacilli")
        .await
        .unwrap();
    env.orchestrator
        .toggle_characteristic(id, "Oxidase positive")
        .await
        .unwrap();
    env.orchestrator.advance(id).await.unwrap();

    env.orchestrator
        .select_medium(id, "Ashdown Agar")
        .await
        .unwrap();
    env.orchestrator.advance(id).await.unwrap();

    let image = env.tmp.path().join("sample.jpg");
    tokio::fs::write(&image, b"fakejpegbytes").await.unwrap();
    env.orchestrator
        .attach_image(id, image.to_str().unwrap())
        .await
        .unwrap();
    env.orchestrator.advance(id).await.unwrap();

    env.orchestrator
        .set_colony_age(id, ColonyAge::H48)
        .await
        .unwrap();
    env.orchestrator.advance(id).await.unwrap();

    let snapshot = env.orchestrator.get_session(id).await.unwrap();
    assert_eq!(snapshot.draft.stage, AnalysisStage::Ready);
    id
}

#[tokio::test]
async fn test_successful_submission_end_to_end() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    let outcome = env.orchestrator.submit(id).await.unwrap();

    assert_eq!(outcome.state, SubmissionState::Succeeded);
    assert_eq!(outcome.result.result, "B. pseudomallei");
    assert_eq!(outcome.confidence_level, ConfidenceLevel::VeryHigh);
    assert!(outcome.saved);
    assert!(outcome.save_notice.is_none());

    // The stub saw the normalized medium, not the label
    assert_eq!(outcome.result.metadata.agar, "Ashdown");
    assert_eq!(outcome.result.metadata.colony_age, "48h");

    // Session is terminal with a frozen draft
    let session = env.orchestrator.get_session(id).await.unwrap();
    assert_eq!(session.state, SubmissionState::Succeeded);
    assert!(session.draft.frozen);

    // Exactly one history row, confidence stored as a fraction
    let records = db::analyses::list_analyses(&env.pool, "tech-1", None)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!((records[0].confidence - 0.92).abs() < 1e-9);
    assert_eq!(records[0].culture_medium, "Ashdown Agar");

    assert_eq!(env.predict_stub.predict_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_uploaded_image_round_trips_through_storage() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    let session = env.orchestrator.get_session(id).await.unwrap();
    let image_ref = session.draft.sample_image_ref.unwrap();
    assert!(image_ref.starts_with("http"));
    assert!(image_ref.contains("colony-images/tech-1/"));

    // One object stored under the owner's namespace
    let objects = env.storage_stub.objects.lock().await;
    assert_eq!(objects.len(), 1);
    let key = objects.keys().next().unwrap();
    assert!(key.starts_with("colony-images/tech-1/"));
    assert!(key.ends_with(".jpg"));
}

#[tokio::test]
async fn test_degraded_health_blocks_predict() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    env.predict_stub.healthy.store(false, Ordering::SeqCst);

    let err = env.orchestrator.submit(id).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Analysis(AnalysisError::ServiceUnavailable(_))
    ));

    // No /predict call was made
    assert_eq!(env.predict_stub.predict_calls.load(Ordering::SeqCst), 0);

    // Session is FAILED with the message recorded, ready for explicit retry
    let session = env.orchestrator.get_session(id).await.unwrap();
    assert_eq!(session.state, SubmissionState::Failed);
    assert!(session.error.is_some());
    assert!(session.can_submit());
}

#[tokio::test]
async fn test_model_not_loaded_is_unhealthy() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    env.predict_stub.model_loaded.store(false, Ordering::SeqCst);

    let err = env.orchestrator.submit(id).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Analysis(AnalysisError::ServiceUnavailable(_))
    ));
    assert_eq!(env.predict_stub.predict_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_retry_after_failure_succeeds() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    env.predict_stub.healthy.store(false, Ordering::SeqCst);
    assert!(env.orchestrator.submit(id).await.is_err());

    // Service recovers; the same submit call is the retry transition
    env.predict_stub.healthy.store(true, Ordering::SeqCst);
    let outcome = env.orchestrator.submit(id).await.unwrap();
    assert_eq!(outcome.state, SubmissionState::Succeeded);
    assert_eq!(env.predict_stub.predict_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_predict_error_surfaces_server_message() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    env.predict_stub.fail_predict.store(true, Ordering::SeqCst);

    let err = env.orchestrator.submit(id).await.unwrap_err();
    match err {
        ApiError::Analysis(AnalysisError::PredictionFailed(msg)) => {
            assert_eq!(msg, "model timeout");
        }
        other => panic!("Expected PredictionFailed, got {:?}", other),
    }

    let session = env.orchestrator.get_session(id).await.unwrap();
    assert_eq!(session.state, SubmissionState::Failed);
}

#[tokio::test]
async fn test_second_submission_rejected_while_in_flight() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    // Slow the health probe so the first submission is still in flight
    env.predict_stub.health_delay_ms.store(300, Ordering::SeqCst);

    let orchestrator = env.orchestrator.clone();
    let first = tokio::spawn(async move { orchestrator.submit(id).await });

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let err = env.orchestrator.submit(id).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.state, SubmissionState::Succeeded);

    // The rejected submission issued no network calls of its own
    assert_eq!(env.predict_stub.health_calls.load(Ordering::SeqCst), 1);
    assert_eq!(env.predict_stub.predict_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_completed_session_rejects_resubmission() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    env.orchestrator.submit(id).await.unwrap();
    let err = env.orchestrator.submit(id).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(env.predict_stub.predict_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_submit_before_ready_is_rejected_without_network() {
    let env = test_env().await;
    let session = env.orchestrator.create_session("tech-1".to_string()).await;

    let err = env.orchestrator.submit(session.session_id).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert_eq!(env.predict_stub.health_calls.load(Ordering::SeqCst), 0);
    assert_eq!(env.predict_stub.predict_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_persistence_failure_is_non_fatal() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    // Break the history store after the draft is complete
    sqlx::query("DROP TABLE analyses")
        .execute(&env.pool)
        .await
        .unwrap();

    let outcome = env.orchestrator.submit(id).await.unwrap();

    // The prediction is still returned and the session still succeeds
    assert_eq!(outcome.state, SubmissionState::Succeeded);
    assert_eq!(outcome.result.result, "B. pseudomallei");
    assert!(!outcome.saved);
    assert!(outcome.save_notice.is_some());

    let session = env.orchestrator.get_session(id).await.unwrap();
    assert_eq!(session.state, SubmissionState::Succeeded);
}

#[tokio::test]
async fn test_upload_failure_leaves_draft_unchanged() {
    let env = test_env().await;
    let session = env.orchestrator.create_session("tech-1".to_string()).await;
    let id = session.session_id;

    env.storage_stub.fail_upload.store(true, Ordering::SeqCst);

    let image = env.tmp.path().join("sample.jpg");
    tokio::fs::write(&image, b"fakejpegbytes").await.unwrap();

    let err = env
        .orchestrator
        .attach_image(id, image.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Analysis(AnalysisError::Upload(_))));

    let snapshot = env.orchestrator.get_session(id).await.unwrap();
    assert!(snapshot.draft.sample_image_ref.is_none());
}

#[tokio::test]
async fn test_signing_failure_is_fatal_to_capture_step() {
    let env = test_env().await;
    let session = env.orchestrator.create_session("tech-1".to_string()).await;
    let id = session.session_id;

    env.storage_stub.fail_sign.store(true, Ordering::SeqCst);

    let image = env.tmp.path().join("sample.jpg");
    tokio::fs::write(&image, b"fakejpegbytes").await.unwrap();

    let err = env
        .orchestrator
        .attach_image(id, image.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Analysis(AnalysisError::Upload(_))));

    // The orphaned object stays in the bucket (accepted leak), but the
    // draft never references it
    assert_eq!(env.storage_stub.objects.lock().await.len(), 1);
    let snapshot = env.orchestrator.get_session(id).await.unwrap();
    assert!(snapshot.draft.sample_image_ref.is_none());
}

#[tokio::test]
async fn test_draft_locked_while_submission_in_flight() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    env.predict_stub.health_delay_ms.store(300, Ordering::SeqCst);

    let orchestrator = env.orchestrator.clone();
    let submission = tokio::spawn(async move { orchestrator.submit(id).await });

    // Mutations land while the health probe is still sleeping
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let err = env
        .orchestrator
        .toggle_characteristic(id, "Oxidase positive")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    let err = env
        .orchestrator
        .select_medium(id, "Blood Agar")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // The submitted snapshot went through unchanged
    let outcome = submission.await.unwrap().unwrap();
    assert_eq!(outcome.state, SubmissionState::Succeeded);
    let session = env.orchestrator.get_session(id).await.unwrap();
    assert!(session
        .draft
        .characteristics
        .contains(&"Oxidase positive".to_string()));
    assert_eq!(session.draft.culture_medium.as_deref(), Some("Ashdown Agar"));

    // The history row agrees with the session's draft
    let records = db::analyses::list_analyses(&env.pool, "tech-1", None)
        .await
        .unwrap();
    assert_eq!(records[0].culture_medium, "Ashdown Agar");
    assert_eq!(records[0].characteristics, session.draft.characteristics);
}

#[tokio::test]
async fn test_completed_session_rejects_draft_mutation() {
    let env = test_env().await;
    let id = ready_session(&env).await;
    env.orchestrator.submit(id).await.unwrap();

    let err = env
        .orchestrator
        .toggle_characteristic(id, "Bipolar appearance")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let image = env.tmp.path().join("late.jpg");
    tokio::fs::write(&image, b"fakejpegbytes").await.unwrap();
    let err = env
        .orchestrator
        .attach_image(id, image.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn test_abandoned_session_discards_in_flight_result() {
    let env = test_env().await;
    let id = ready_session(&env).await;

    env.predict_stub.health_delay_ms.store(300, Ordering::SeqCst);

    let orchestrator = env.orchestrator.clone();
    let submission = tokio::spawn(async move { orchestrator.submit(id).await });

    // Abandon while the health probe is still sleeping
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    env.orchestrator.abandon_session(id).await.unwrap();

    // The pending submission resolves without writing anywhere
    assert!(submission.await.unwrap().is_err());
    let records = db::analyses::list_analyses(&env.pool, "tech-1", None)
        .await
        .unwrap();
    assert!(records.is_empty());
    assert!(env.orchestrator.get_session(id).await.is_err());
}
