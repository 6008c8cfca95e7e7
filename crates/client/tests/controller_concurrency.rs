//! Interleaving tests for `JobController`: overlapping submissions, manual
//! polls racing a submission, and answers that arrive for a job the
//! session no longer tracks.
//!
//! The scripted service holds status queries and submissions behind
//! gates so each interleaving is forced rather than left to scheduling.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::time::sleep;

use common::*;
use editkit_client::JobEvent;
use editkit_core::job::JobState;
use editkit_core::media::MediaKind;
use editkit_core::params::VideoTransform;
use editkit_core::types::JobHandle;

// ---------------------------------------------------------------------------
// Test: a manual poll finishing its job does not stop a newer job's loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn terminal_manual_poll_leaves_newer_job_polling() {
    let dir = tempfile::tempdir().unwrap();
    let path = media_file(&dir, "clip.mp4", MB);
    let service = ScriptedService::with_statuses([
        processing(10.0),
        completed(),
        processing(20.0),
        processing(50.0),
        completed(),
    ]);
    let controller = Arc::new(controller(&service));
    let info = controller.upload(&path, MediaKind::Video, None).await.unwrap();

    controller
        .submit(&info.handle, VideoTransform::default().into())
        .await
        .unwrap();
    until(|| service.polls_for("J1") == 1).await;

    // The manual poll fetches J1's completion but is held before applying it.
    service.hold_status("J1");
    let poll = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.poll().await }
    });
    service.status_gate.until_waiting(1).await;

    // A second submission replaces the loop and is held inside the service.
    service.submit_gate.close();
    let submit = tokio::spawn({
        let controller = Arc::clone(&controller);
        let upload = info.handle.clone();
        async move {
            controller
                .submit(&upload, VideoTransform::resize_dimensions_default().into())
                .await
        }
    });
    service.submit_gate.until_waiting(1).await;

    // J1's completion lands while J2's submission is still in flight.
    service.status_gate.open();
    loop {
        let last = controller.session().await.last_status;
        if last.is_some_and(|s| s.job.as_str() == "J1" && s.state == JobState::Completed) {
            break;
        }
        tokio::task::yield_now().await;
    }

    service.submit_gate.open();
    let second = submit.await.unwrap().unwrap();
    assert_eq!(second.as_str(), "J2");
    let polled = poll.await.unwrap().unwrap().unwrap();
    assert_eq!(polled.job.as_str(), "J1");
    assert_eq!(polled.state, JobState::Completed);

    let status = controller.wait_for_terminal().await.unwrap();
    assert_eq!(status.job, JobHandle::new("J2"));
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(service.polls_for("J2"), 3);
}

// ---------------------------------------------------------------------------
// Test: overlapping submissions are serialised; the later one wins
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn overlapping_submissions_poll_only_the_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = media_file(&dir, "clip.mp4", MB);
    let service = ScriptedService::new();
    let controller = controller(&service);
    let info = controller.upload(&path, MediaKind::Video, None).await.unwrap();
    let mut events = controller.subscribe();

    service.submit_gate.close();
    let (first, second, _) = tokio::join!(
        controller.submit(&info.handle, VideoTransform::default().into()),
        controller.submit(&info.handle, VideoTransform::resize_dimensions_default().into()),
        async {
            service.submit_gate.until_waiting(1).await;
            // Only the first submission reaches the service; the second
            // waits for it to finish.
            assert_eq!(service.submit_count(), 1);
            service.submit_gate.open();
        },
    );
    assert_eq!(first.unwrap().as_str(), "J1");
    assert_eq!(second.unwrap().as_str(), "J2");

    let j1_polls = service.polls_for("J1");
    assert!(j1_polls <= 1);
    sleep(Duration::from_millis(4500)).await;

    assert_eq!(service.polls_for("J1"), j1_polls);
    assert_eq!(service.polls_for("J2"), 3);
    assert_eq!(controller.session().await.job, Some(JobHandle::new("J2")));

    let events = drain_events(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        JobEvent::PollingCancelled { job, .. } if job.as_str() == "J1"
    )));
    assert!(!events.iter().any(|e| matches!(
        e,
        JobEvent::PollingCancelled { job, .. } if job.as_str() == "J2"
    )));
}

// ---------------------------------------------------------------------------
// Test: a late answer for a superseded job changes nothing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn late_status_for_superseded_job_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = media_file(&dir, "clip.mp4", MB);
    let service = ScriptedService::with_statuses([processing(10.0), completed(), processing(20.0)]);
    let controller = Arc::new(controller(&service));
    let info = controller.upload(&path, MediaKind::Video, None).await.unwrap();

    controller
        .submit(&info.handle, VideoTransform::default().into())
        .await
        .unwrap();
    until(|| service.polls_for("J1") == 1).await;

    service.hold_status("J1");
    let poll = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.poll().await }
    });
    service.status_gate.until_waiting(1).await;

    let second = controller
        .submit(&info.handle, VideoTransform::resize_dimensions_default().into())
        .await
        .unwrap();
    assert_eq!(second.as_str(), "J2");
    until(|| service.polls_for("J2") == 1).await;
    let before = controller.session().await;

    let mut notes = controller.notifications();
    let mut events = controller.subscribe();
    service.status_gate.open();
    assert_matches!(poll.await.unwrap(), Ok(None));

    let after = controller.session().await;
    assert_eq!(after.job, Some(JobHandle::new("J2")));
    assert_eq!(after.last_status, before.last_status);
    assert!(drain_notifications(&mut notes).is_empty());
    assert!(!drain_events(&mut events)
        .iter()
        .any(|e| matches!(e, JobEvent::Completed { .. } | JobEvent::Failed { .. })));

    // J2 is still tracked and still polled.
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(service.polls_for("J2"), 2);
}
