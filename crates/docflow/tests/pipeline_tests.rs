//! End-to-end behaviour of submission, workers and reconciliation with a
//! stub renderer.

mod common;

use std::sync::{mpsc, Arc};
use std::time::Duration;

use common::*;
use docflow::broker::{InMemoryBroker, MessageBroker, CONVERT_TOPIC};
use docflow::config::WorkerConfig;
use docflow::error::ValidationError;
use docflow::model::{JobParams, JobStatus, Operation};
use docflow::store::JobStore;
use docflow::submission::{FailureKind, SubmissionService, SubmitError, SubmitRequest};

#[test]
fn test_single_file_submission_completes() {
    let harness = TestHarness::new();
    let accepted = harness.submit(Operation::Compress, vec![pdf_file("scan.pdf", 2)]);
    assert_eq!(accepted.status, JobStatus::Pending);

    let job = harness.wait(&accepted.job_id);
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.error, None);
    assert_eq!(harness.job_count(), 1);

    let sub_jobs = harness.jobs.sub_jobs_for(&job.id).unwrap();
    assert_eq!(sub_jobs.len(), 1);
    let output = Operation::Compress.output_path(&job.id);
    assert_eq!(sub_jobs[0].output_path.as_deref(), Some(output.as_str()));
    assert!(harness.object(&output).is_some());
}

#[test]
fn test_merge_records_one_sub_job_per_file() {
    let harness = TestHarness::new();
    let files = vec![
        pdf_file("a.pdf", 1),
        pdf_file("b.pdf", 2),
        png_file("c.png"),
    ];
    let accepted = harness.submit(Operation::Merge, files);
    let job = harness.wait(&accepted.job_id);
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.original_filename, "a.pdf");

    let sub_jobs = harness.jobs.sub_jobs_for(&job.id).unwrap();
    assert_eq!(sub_jobs.len(), 3);
    let names: Vec<_> = sub_jobs.iter().map(|s| s.original_name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "c.png"]);
    for sub_job in &sub_jobs {
        assert_eq!(sub_job.job_id, job.id);
        assert_eq!(sub_job.operation, Operation::Merge);
        assert_eq!(
            sub_job.output_path.as_deref(),
            Some(Operation::Merge.output_path(&job.id).as_str())
        );
    }
}

#[test]
fn test_merge_with_one_file_is_rejected() {
    let harness = TestHarness::new();
    let err = harness
        .service()
        .submit_job(SubmitRequest::new(Operation::Merge, vec![pdf_file("a.pdf", 1)]))
        .unwrap_err();

    assert!(matches!(
        err,
        SubmitError::Validation(ValidationError::TooFewFiles {
            required: 2,
            actual: 1,
            ..
        })
    ));
    assert_eq!(err.status_code(), 400);
    assert_eq!(harness.job_count(), 0);
}

#[test]
fn test_split_with_empty_range_is_rejected() {
    let harness = TestHarness::new();
    let err = harness
        .service()
        .submit_job(split_request(pdf_file("a.pdf", 3), ""))
        .unwrap_err();

    assert!(matches!(err, SubmitError::Validation(_)));
    assert_eq!(harness.job_count(), 0);
    assert!(harness.jobs.list_sub_jobs(10).unwrap().is_empty());
}

#[test]
fn test_renderer_failure_marks_job_failed() {
    let harness = TestHarness::with_renderer(Arc::new(RejectingRenderer {
        reason: "encrypted document",
    }));
    let accepted = harness.submit(Operation::ToPng, vec![pdf_file("locked.pdf", 1)]);

    let job = harness.wait(&accepted.job_id);
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("encrypted document"));

    // No artifact without COMPLETED.
    assert!(harness
        .object(&Operation::ToPng.output_path(&accepted.job_id))
        .is_none());
    let sub_jobs = harness.jobs.sub_jobs_for(&accepted.job_id).unwrap();
    assert_eq!(sub_jobs[0].output_path, None);
}

#[test]
fn test_upload_failure_fails_job_without_publishing() {
    let harness = TestHarness::idle(Arc::new(StubRenderer::default()));
    let objects = Arc::new(FailingObjectStore {
        inner: harness.objects.clone(),
        prefix: "uploads/",
    });
    let service = SubmissionService::new(harness.jobs.clone(), objects, harness.broker.clone());
    let (_subscription, rx) = watch_convert_topic(&harness);

    let err = service
        .submit_job(SubmitRequest::new(Operation::ToJpg, vec![png_file("a.png")]))
        .unwrap_err();

    let job_id = match &err {
        SubmitError::Internal {
            job_id: Some(job_id),
            kind: FailureKind::Persistence,
            ..
        } => job_id.clone(),
        other => panic!("unexpected error: {:?}", other),
    };
    assert_eq!(err.status_code(), 500);

    let job = harness.jobs.find_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert!(error.contains("disk full"), "error text: {}", error);
    assert!(harness.jobs.sub_jobs_for(&job_id).unwrap().is_empty());

    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

/// Collects every payload published on the convert topic.
fn watch_convert_topic(harness: &TestHarness) -> (docflow::broker::Subscription, mpsc::Receiver<Vec<u8>>) {
    let (tx, rx) = mpsc::channel();
    let subscription = harness
        .broker
        .subscribe(
            CONVERT_TOPIC,
            Box::new(move |payload: &[u8]| {
                let _ = tx.send(payload.to_vec());
            }),
        )
        .unwrap();
    (subscription, rx)
}

#[test]
fn test_sub_job_failure_fails_job_without_publishing() {
    let harness = TestHarness::idle(Arc::new(StubRenderer::default()));
    let jobs = Arc::new(FlakyJobStore::new(harness.jobs.clone()));
    jobs.set_fail_sub_jobs(true);
    let service = SubmissionService::new(jobs, harness.objects.clone(), harness.broker.clone());
    let (_subscription, rx) = watch_convert_topic(&harness);

    let err = service
        .submit_job(SubmitRequest::new(Operation::ToPdf, vec![png_file("a.png")]))
        .unwrap_err();

    let job_id = match &err {
        SubmitError::Internal {
            job_id: Some(job_id),
            kind: FailureKind::Persistence,
            ..
        } => job_id.clone(),
        other => panic!("unexpected error: {:?}", other),
    };
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.to_body().job_id.as_deref(), Some(job_id.as_str()));

    let job = harness.jobs.find_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.is_some());
    assert!(harness.jobs.sub_jobs_for(&job_id).unwrap().is_empty());

    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn test_publish_failure_fails_job() {
    let harness = TestHarness::idle(Arc::new(StubRenderer::default()));
    harness.broker.close(CONVERT_TOPIC);

    let err = harness
        .service()
        .submit_job(SubmitRequest::new(Operation::ToPdf, vec![png_file("a.png")]))
        .unwrap_err();

    let job_id = match &err {
        SubmitError::Internal {
            job_id: Some(job_id),
            kind: FailureKind::Transport,
            ..
        } => job_id.clone(),
        other => panic!("unexpected error: {:?}", other),
    };
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.to_body().error, "transport_error");

    let job = harness.jobs.find_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    // Uploads and sub-jobs were written before the publish attempt.
    assert_eq!(harness.jobs.sub_jobs_for(&job_id).unwrap().len(), 1);
}

#[test]
fn test_unrecorded_output_is_removed() {
    let mut harness = TestHarness::idle(Arc::new(StubRenderer::default()));
    let jobs = Arc::new(FlakyJobStore::new(harness.jobs.clone()));
    jobs.set_fail_output_paths(true);
    harness.use_job_store(jobs);
    harness.start();

    let accepted = harness.submit(Operation::Compress, vec![pdf_file("scan.pdf", 1)]);
    let job = harness.wait(&accepted.job_id);
    assert_eq!(job.status, JobStatus::Failed);

    assert!(harness
        .object(&Operation::Compress.output_path(&job.id))
        .is_none());
    let sub_jobs = harness.jobs.sub_jobs_for(&job.id).unwrap();
    assert_eq!(sub_jobs[0].output_path, None);
}

#[test]
fn test_burst_beyond_queue_capacity_loses_nothing() {
    let stub = Arc::new(StubRenderer::slow(Duration::from_millis(20)));
    let mut harness = TestHarness::idle_with_broker(stub.clone(), InMemoryBroker::new(2));
    harness.start_with(&WorkerConfig {
        worker_count: 1,
        queue_capacity: Some(1),
    });

    let ids: Vec<_> = (0..30)
        .map(|i| {
            harness
                .submit(Operation::ToPdf, vec![png_file(&format!("{}.png", i))])
                .job_id
        })
        .collect();

    harness.shutdown();

    assert_eq!(stub.calls(), 30);
    for id in ids {
        assert_eq!(harness.jobs.find_job(&id).unwrap().status, JobStatus::Completed);
        assert!(harness.object(&Operation::ToPdf.output_path(&id)).is_some());
    }
}

#[test]
fn test_concurrent_submissions_all_finish() {
    let harness = Arc::new(TestHarness::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let harness = Arc::clone(&harness);
            std::thread::spawn(move || {
                let accepted =
                    harness.submit(Operation::Compress, vec![pdf_file(&format!("{}.pdf", i), 1)]);
                harness.wait(&accepted.job_id)
            })
        })
        .collect();

    for handle in handles {
        let job = handle.join().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }
    assert_eq!(harness.job_count(), 8);
}

#[test]
fn test_shutdown_drains_queued_jobs() {
    let stub = Arc::new(StubRenderer::default());
    let mut harness = TestHarness::with_renderer(stub.clone());

    let ids: Vec<_> = (0..12)
        .map(|i| {
            harness
                .submit(Operation::ToPdf, vec![png_file(&format!("{}.png", i))])
                .job_id
        })
        .collect();

    harness.shutdown();

    assert_eq!(stub.calls(), 12);
    for id in ids {
        assert_eq!(harness.jobs.find_job(&id).unwrap().status, JobStatus::Completed);
        assert!(harness.object(&Operation::ToPdf.output_path(&id)).is_some());
    }
}

#[test]
fn test_params_reach_the_worker() {
    let harness = TestHarness::new();
    let request = SubmitRequest::new(Operation::ToJpg, vec![png_file("a.png")]).with_params(JobParams {
        quality: Some(40),
        ..Default::default()
    });
    let accepted = harness.service().submit_job(request).unwrap();
    let job = harness.wait(&accepted.job_id);
    assert_eq!(job.params.quality, Some(40));
}

#[test]
fn test_get_job_not_found() {
    let harness = TestHarness::new();
    let err = harness.service().get_job("no-such-job").unwrap_err();
    assert!(matches!(err, SubmitError::NotFound(_)));
    assert_eq!(err.to_body().error, "not_found");
}
