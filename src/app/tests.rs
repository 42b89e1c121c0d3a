use super::monitor::{alarm_receiver, watch_alarm_events};
use super::*;
use crate::alarm::{AlarmDebouncer, AlarmLog, AlarmState, ManualAlarm};
use crate::config::FirewatchConfig;
use crate::detector::DetectionResult;
use crate::error::{FirewatchError, SourceError};
use crate::events::{EventBus, FireEvent};
use crate::pipeline::{PipelineUpdate, RunOutcome, SessionMetrics};
use crate::source::SourceSpec;
use image::{Rgb, RgbImage};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn write_frames(dir: &Path, fire: &[bool]) {
    for (i, on_fire) in fire.iter().enumerate() {
        let mut image = RgbImage::new(200, 100);
        if *on_fire {
            for y in 45..55 {
                for x in 80..120 {
                    image.put_pixel(x, y, Rgb([255, 60, 0]));
                }
            }
        }
        image.save(dir.join(format!("frame_{:03}.png", i))).unwrap();
    }
}

fn create_test_config(workdir: &Path) -> FirewatchConfig {
    let mut config = FirewatchConfig::default();
    config.output.sequence_fps = 500.0;
    config.output.channel_capacity = 16;
    config.output.snapshot_dir = Some(workdir.join("snapshots").to_string_lossy().into_owned());
    config.alarm.log_path = Some(workdir.join("alarm_log.jsonl").to_string_lossy().into_owned());
    config.overlay.font_path = workdir.join("missing.ttf").to_string_lossy().into_owned();
    config
}

fn update(frame_id: u64, active: bool) -> PipelineUpdate {
    PipelineUpdate {
        frame_id,
        annotated_frame: RgbImage::new(64, 48),
        metrics: SessionMetrics {
            frames_processed: frame_id + 1,
            elapsed: Duration::from_millis(33 * (frame_id + 1)),
            instantaneous_fps: 30.0,
        },
        alarm_state: AlarmState {
            active,
            raised_at: active.then_some(Duration::ZERO),
        },
        detection: DetectionResult::empty(),
    }
}

#[tokio::test]
async fn test_session_over_image_directory() {
    let workdir = TempDir::new().unwrap();
    let frames = workdir.path().join("frames");
    std::fs::create_dir_all(&frames).unwrap();
    write_frames(&frames, &[false, false, true, true, false, false]);

    let config = create_test_config(workdir.path());
    let log_path = config.alarm.log_path.clone().unwrap();
    let snapshot_dir = workdir.path().join("snapshots");

    let mut app = FirewatchApp::new(config, SourceSpec::FilePath(frames.clone()));
    let mut events = app.event_bus().subscribe();

    let reason = app.run().await.unwrap();
    assert_eq!(reason, ShutdownReason::EndOfStream);

    let log = AlarmLog::open(&log_path, "UTC").await.unwrap();
    let entries = log.read_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].alarm_type, "automatic");
    assert_eq!(
        entries[0].location,
        format!("video file: {}", frames.display())
    );

    let snapshots: Vec<_> = std::fs::read_dir(&snapshot_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .collect();
    assert_eq!(snapshots.len(), 1);

    let mut raised = 0;
    while let Ok(event) = events.try_recv() {
        if event.event_type() == "alarm_raised" {
            raised += 1;
        }
    }
    assert_eq!(raised, 1);
}

#[tokio::test]
async fn test_missing_source_fails_before_running() {
    let workdir = TempDir::new().unwrap();
    let config = create_test_config(workdir.path());
    let spec = SourceSpec::FilePath(workdir.path().join("nowhere.mp4"));

    let mut app = FirewatchApp::new(config, spec);
    let result = app.run().await;

    assert!(matches!(
        result,
        Err(FirewatchError::Source(SourceError::Unavailable { .. }))
    ));
}

#[tokio::test]
async fn test_cancelled_session_reports_user_request() {
    let workdir = TempDir::new().unwrap();
    let frames = workdir.path().join("frames");
    std::fs::create_dir_all(&frames).unwrap();
    write_frames(&frames, &[false; 4]);

    let mut app = FirewatchApp::new(create_test_config(workdir.path()), SourceSpec::FilePath(frames));
    app.cancellation_token().cancel();

    assert_eq!(app.run().await.unwrap(), ShutdownReason::UserRequest);
}

#[tokio::test]
async fn test_presenter_saves_snapshot_on_activation() {
    let workdir = TempDir::new().unwrap();
    let presenter = Presenter::new(Some(workdir.path().join("shots")));

    let (tx, rx) = mpsc::channel(8);
    for (id, active) in [(0, false), (1, true), (2, true), (3, false), (4, true)] {
        tx.send(update(id, active)).await.unwrap();
    }
    drop(tx);

    let stats = presenter.run(rx).await;
    assert_eq!(stats.updates_received, 5);
    assert_eq!(stats.alarmed_frames, 3);
    assert_eq!(stats.snapshots_saved, 2);
    assert_eq!(std::fs::read_dir(workdir.path().join("shots")).unwrap().count(), 2);
}

#[tokio::test]
async fn test_presenter_without_snapshot_dir() {
    let presenter = Presenter::new(None);
    let (tx, rx) = mpsc::channel(4);
    tx.send(update(0, true)).await.unwrap();
    drop(tx);

    let stats = presenter.run(rx).await;
    assert_eq!(stats.alarmed_frames, 1);
    assert_eq!(stats.snapshots_saved, 0);
}

#[test]
fn test_shutdown_reason_from_outcome() {
    assert_eq!(
        ShutdownReason::from(RunOutcome::EndOfStream),
        ShutdownReason::EndOfStream
    );
    assert_eq!(
        ShutdownReason::from(RunOutcome::Stopped),
        ShutdownReason::UserRequest
    );
    assert_eq!(
        ShutdownReason::from(RunOutcome::PresentationClosed),
        ShutdownReason::PresentationClosed
    );
}

fn manual_raised(location: &str) -> FireEvent {
    let request = ManualAlarm::new(location, "drill").unwrap();
    FireEvent::AlarmRaised {
        notification: AlarmDebouncer::new(Default::default(), Default::default()).manual(&request),
    }
}

#[tokio::test]
async fn test_alarm_activity_counts_until_session_finished() {
    let bus = EventBus::new(16);
    let stop = CancellationToken::new();
    let watcher = tokio::spawn(watch_alarm_events(
        alarm_receiver(bus.subscribe()),
        stop.clone(),
    ));

    bus.publish(manual_raised("atrium")).unwrap();
    bus.publish(FireEvent::AlarmCleared {
        frame_time: Duration::from_millis(66),
        timestamp: SystemTime::now(),
    })
    .unwrap();
    bus.publish(FireEvent::SessionFinished {
        session_id: Uuid::new_v4(),
        outcome: RunOutcome::EndOfStream,
        frames_processed: 3,
    })
    .unwrap();
    // Anything after the session ends is not counted
    bus.publish(manual_raised("lobby")).unwrap();

    let activity = tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(activity.manual_raised, 1);
    assert_eq!(activity.automatic_raised, 0);
    assert_eq!(activity.cleared, 1);
    assert_eq!(activity.total_raised(), 1);
}

#[tokio::test]
async fn test_alarm_activity_drains_queue_before_stopping() {
    let bus = EventBus::new(16);
    let stop = CancellationToken::new();
    let receiver = alarm_receiver(bus.subscribe());

    bus.publish(manual_raised("atrium")).unwrap();
    bus.publish(FireEvent::SystemError {
        component: "pipeline".to_string(),
        error: "device lost".to_string(),
    })
    .unwrap();
    stop.cancel();

    let activity = watch_alarm_events(receiver, stop).await;
    assert_eq!(activity.manual_raised, 1);
    assert_eq!(activity.system_errors, 1);
}
