use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use biosense_core::synthetic::{FaceParams, SyntheticFace, SyntheticVoice, VoiceParams};
use biosense_core::{
    AudioSource, BiomarkerSnapshot, BiosenseConfig, CallbackSink, ChannelSink, CycleOutcome, Device,
    FrameSource, NoSource, SessionController, SessionError, SessionStatus, SourceError,
    StopHandle,
};
use biosense_signals::VideoFrame;

const FPS: f32 = 30.0;

fn face(seconds: f32) -> SyntheticFace {
    SyntheticFace::new(FaceParams {
        duration_s: Some(seconds),
        ..FaceParams::default()
    })
}

fn collecting_sink() -> (CallbackSink<impl FnMut(BiomarkerSnapshot) + Send>, Arc<Mutex<Vec<BiomarkerSnapshot>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink = CallbackSink(move |s: BiomarkerSnapshot| sink_seen.lock().unwrap().push(s));
    (sink, seen)
}

fn status_log<F: FrameSource, A: AudioSource>(
    session: &mut SessionController<F, A>,
) -> Arc<Mutex<Vec<SessionStatus>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let observer_log = Arc::clone(&log);
    session.add_observer(move |s: &SessionStatus| observer_log.lock().unwrap().push(s.clone()));
    log
}

fn run_frames<F: FrameSource, A: AudioSource>(
    session: &mut SessionController<F, A>,
    ticks: usize,
) -> Result<(), SessionError> {
    for _ in 0..ticks {
        session.tick()?;
    }
    Ok(())
}

#[test]
fn detects_72_bpm_from_synthetic_face() {
    let (sink, seen) = collecting_sink();
    let mut session =
        SessionController::new(BiosenseConfig::default(), face(20.0), NoSource, sink).unwrap();
    let statuses = status_log(&mut session);

    run_frames(&mut session, (20.0 * FPS) as usize).unwrap();

    let snapshots = seen.lock().unwrap();
    let rates: Vec<u32> = snapshots.iter().filter_map(|s| s.rppg.heart_rate_bpm).collect();
    assert!(rates.len() >= 10, "only {} heart-rate snapshots", rates.len());
    let last = *rates.last().unwrap();
    assert!(last.abs_diff(72) <= 3, "heart rate {last}");
    assert!(rates.iter().all(|bpm| (45..=200).contains(bpm)));

    assert!(snapshots.iter().any(|s| s.rppg.hrv.rmssd_ms.is_some()));
    for s in snapshots.iter() {
        assert!(s.calculated_count > 0);
        assert!((0.0..=1.0).contains(&s.quality_score));
        assert!(s.voice.is_empty());
    }

    assert_eq!(
        *statuses.lock().unwrap(),
        vec![SessionStatus::Ready, SessionStatus::Analyzing]
    );
    let stats = session.stats();
    assert_eq!(stats.frames_seen, 600);
    assert_eq!(stats.frames_accepted, 600);
    assert_eq!(stats.snapshots_emitted as usize, snapshots.len());
}

#[test]
fn silence_populates_no_voice_fields() {
    let (sink, seen) = collecting_sink();
    let voice = SyntheticVoice::aligned_to(
        VoiceParams {
            silent: true,
            duration_s: Some(3.0),
            ..VoiceParams::default()
        },
        FPS,
    );
    let mut session =
        SessionController::new(BiosenseConfig::default(), NoSource, voice, sink).unwrap();
    let statuses = status_log(&mut session);

    run_frames(&mut session, (3.0 * FPS) as usize).unwrap();

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(*session.status(), SessionStatus::Analyzing);
    assert_eq!(*statuses.lock().unwrap(), vec![SessionStatus::Analyzing]);
    assert!(session.stats().cycles >= 2);
    assert!(session.stats().audio_blocks >= 89);
}

#[test]
fn stop_mid_tick_ends_emission() {
    let stop = StopHandle::new();
    let sink_stop = stop.clone();
    let seen = Arc::new(Mutex::new(0usize));
    let sink_seen = Arc::clone(&seen);
    let sink = CallbackSink(move |_s: BiomarkerSnapshot| {
        let mut n = sink_seen.lock().unwrap();
        *n += 1;
        if *n == 2 {
            sink_stop.stop();
        }
    });
    let mut session = SessionController::new(BiosenseConfig::default(), face(30.0), NoSource, sink)
        .unwrap()
        .with_stop_handle(stop);
    let statuses = status_log(&mut session);

    let mut stopped_at = None;
    for i in 0..(30.0 * FPS) as usize {
        match session.tick() {
            Ok(_) => {}
            Err(SessionError::Stopped) => {
                stopped_at = Some(i);
                break;
            }
            Err(e) => panic!("unexpected error {e}"),
        }
    }

    assert!(stopped_at.is_some());
    assert_eq!(*seen.lock().unwrap(), 2);
    assert_eq!(*session.status(), SessionStatus::Stopped);
    assert_eq!(statuses.lock().unwrap().last(), Some(&SessionStatus::Stopped));

    // Later ticks and pushes are refused and emit nothing
    assert!(matches!(session.tick(), Err(SessionError::Stopped)));
    let frame = VideoFrame::filled(64, 48, [200, 140, 110], 60_000_000);
    assert!(matches!(session.push_frame(&frame), Err(SessionError::Stopped)));
    assert_eq!(*seen.lock().unwrap(), 2);
}

/// Raises the stop flag while its `stop_on`-th frame is being pulled.
struct StoppingFace {
    inner: SyntheticFace,
    stop: StopHandle,
    stop_on: usize,
    pulled: usize,
}

impl FrameSource for StoppingFace {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        self.pulled += 1;
        if self.pulled == self.stop_on {
            self.stop.stop();
        }
        self.inner.next_frame()
    }
}

#[test]
fn stop_from_source_completes_current_tick() {
    // Find the tick that emits the third snapshot
    let (sink, seen) = collecting_sink();
    let mut reference =
        SessionController::new(BiosenseConfig::default(), face(30.0), NoSource, sink).unwrap();
    let mut emitting_tick = None;
    for i in 1..=(30.0 * FPS) as usize {
        reference.tick().unwrap();
        if seen.lock().unwrap().len() == 3 {
            emitting_tick = Some(i);
            break;
        }
    }
    let emitting_tick = emitting_tick.expect("third snapshot never emitted");

    let stop = StopHandle::new();
    let camera = StoppingFace {
        inner: face(30.0),
        stop: stop.clone(),
        stop_on: emitting_tick,
        pulled: 0,
    };
    let (sink, seen) = collecting_sink();
    let mut session = SessionController::new(BiosenseConfig::default(), camera, NoSource, sink)
        .unwrap()
        .with_stop_handle(stop);

    for _ in 1..emitting_tick {
        session.tick().unwrap();
    }
    assert_eq!(seen.lock().unwrap().len(), 2);

    // The flag goes up mid-tick; the due cycle still runs and emits
    let outcome = session.tick().unwrap();
    assert_eq!(outcome, Some(CycleOutcome::Emitted));
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(*session.status(), SessionStatus::Analyzing);

    assert!(matches!(session.tick(), Err(SessionError::Stopped)));
    assert_eq!(*session.status(), SessionStatus::Stopped);
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(session.stats().frames_seen, emitting_tick as u64);
}

struct FailingCamera {
    inner: SyntheticFace,
    remaining: usize,
}

impl FrameSource for FailingCamera {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        if self.remaining == 0 {
            return Err(SourceError::new("camera disconnected"));
        }
        self.remaining -= 1;
        self.inner.next_frame()
    }
}

#[test]
fn device_failure_is_terminal() {
    let camera = FailingCamera {
        inner: face(60.0),
        remaining: 45,
    };
    let mut session =
        SessionController::new(BiosenseConfig::default(), camera, NoSource, ChannelSink::new().0)
            .unwrap();
    let statuses = status_log(&mut session);

    let err = run_frames(&mut session, 100).unwrap_err();
    match err {
        SessionError::DeviceUnavailable { device, reason } => {
            assert_eq!(device, Device::Camera);
            assert_eq!(reason, "camera disconnected");
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(matches!(session.status(), SessionStatus::Failed(_)));
    assert!(matches!(
        statuses.lock().unwrap().last(),
        Some(SessionStatus::Failed(_))
    ));
    assert_eq!(session.stats().frames_seen, 45);
    assert!(matches!(session.tick(), Err(SessionError::Stopped)));
}

#[test]
fn slow_consumer_drops_snapshots() {
    let (sink, rx) = ChannelSink::new();
    let drops = sink.drop_counter();
    let mut session =
        SessionController::new(BiosenseConfig::default(), face(12.0), NoSource, sink).unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..(12.0 * FPS) as usize {
        if let Some(outcome) = session.tick().unwrap() {
            outcomes.push(outcome);
        }
    }

    let stats = session.stats();
    assert_eq!(stats.snapshots_emitted, 1);
    assert!(stats.snapshots_dropped >= 1);
    assert_eq!(drops.load(Ordering::Relaxed), stats.snapshots_dropped);
    assert_eq!(
        outcomes.iter().filter(|o| **o == CycleOutcome::Dropped).count() as u64,
        stats.snapshots_dropped
    );
    assert_eq!(rx.len(), 1);
    assert!(rx.try_recv().unwrap().rppg.heart_rate_bpm.is_some());
}

#[test]
fn face_and_voice_merge_into_one_snapshot() {
    let (sink, seen) = collecting_sink();
    let mut config = BiosenseConfig::default();
    config.diagnostics.enabled = true;
    let voice = SyntheticVoice::aligned_to(VoiceParams::default(), FPS);
    let mut session = SessionController::new(config, face(15.0), voice, sink).unwrap();

    run_frames(&mut session, (15.0 * FPS) as usize).unwrap();

    let snapshots = seen.lock().unwrap();
    let last = snapshots
        .iter()
        .rev()
        .find(|s| s.rppg.heart_rate_bpm.is_some())
        .unwrap();
    let f0 = last.voice.f0_hz.unwrap();
    assert!((f0 - 150.0).abs() < 5.0, "f0 {f0}");
    assert_eq!(last.voice.voiced_ratio, Some(1.0));
    assert!(last.rppg.stress_score.is_some());
    assert_eq!(last.calculated_count, last.rppg.count() + last.voice.count());

    // audio-only cycles before the video window fills still emit voice
    assert!(snapshots[0].rppg.heart_rate_bpm.is_none());
    assert!(snapshots[0].voice.f0_hz.is_some());

    let trace = session.trace();
    assert!(!trace.is_empty());
    let json = trace.to_json().unwrap();
    assert!(json.contains("\"frequency\""));
}

#[test]
fn regressing_timestamps_are_dropped() {
    let (sink, _seen) = collecting_sink();
    let mut session = SessionController::push_driven(BiosenseConfig::default(), sink).unwrap();

    session
        .push_frame(&VideoFrame::filled(64, 48, [200, 140, 110], 1_000_000))
        .unwrap();
    session
        .push_frame(&VideoFrame::filled(64, 48, [200, 140, 110], 500_000))
        .unwrap();

    let stats = session.stats();
    assert_eq!(stats.frames_seen, 2);
    assert_eq!(stats.frames_accepted, 1);
    assert_eq!(stats.timestamp_regressions, 1);
    assert_eq!(session.state().window.len(), 1);
    assert_eq!(session.state().frame_number, 1);
    assert_eq!(*session.status(), SessionStatus::Accumulating);

    // A skin-less frame is seen but never numbered
    session
        .push_frame(&VideoFrame::filled(64, 48, [30, 40, 90], 1_100_000))
        .unwrap();
    assert_eq!(session.stats().frames_seen, 3);
    assert_eq!(session.state().frame_number, 1);
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = BiosenseConfig::default();
    config.session.evaluation_interval_ms = 0;
    let result = SessionController::push_driven(config, ChannelSink::new().0);
    assert!(matches!(result, Err(SessionError::Config(_))));
}
