//! Session Controller
//!
//! Owns every buffer and history in [`SessionState`] and drives the stages
//! of `biosense-signals` from an external tick. Single-threaded: ticks must
//! not overlap. The only cross-thread input is the [`StopHandle`], checked
//! at the top of every tick.
//!
//! Per frame: region extraction, quality gate, buffer append.
//! Per audio block: voice engine over the session's `VoiceState`.
//! Per evaluation cycle: condition, FFT, validate; with an accepted heart
//! rate, synthesize RR intervals and compute HRV, respiration, SpO2, blood
//! pressure, perfusion and stress; merge with the latest voice set and emit
//! one snapshot if anything was computed.

use log::{debug, info, warn};
use serde::Serialize;

use biosense_signals::dsp::stats;
use biosense_signals::physio::{
    HrvEngine, RespirationEstimator, RrSynthesizer, StressEstimator, StressInputs, VitalsEstimator,
};
use biosense_signals::rppg::{
    ConditionerStatus, FrequencyAnalyzer, SignalConditioner, TemporalValidator,
};
use biosense_signals::vision::RegionExtractor;
use biosense_signals::voice::{VoiceEngine, VoiceState};
use biosense_signals::{
    AudioBlock, HeartRateHistory, Rejection, RingBuffer, RrIntervalSeries, SignalWindow,
    VideoFrame, VoiceBiomarkerSet, VoiceFrame,
};

use crate::config::BiosenseConfig;
use crate::diagnostics::{TraceCategory, TraceLog};
use crate::error::{Device, SessionError};
use crate::sink::{Delivery, SnapshotSink};
use crate::snapshot::{BiomarkerSnapshot, RppgBiomarkers};
use crate::source::{AudioSource, FrameSource, NoSource};
use crate::status::{SessionStatus, StatusObserver, StopHandle};
use crate::timestamp::TimestampLog;

/// All mutable per-session data. Stages only ever borrow it.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Green channel
    pub window: SignalWindow,
    pub red: RingBuffer<f32>,
    pub blue: RingBuffer<f32>,
    /// Extraction quality per buffered sample
    pub quality: RingBuffer<f32>,
    pub hr_history: HeartRateHistory,
    pub rr: RrIntervalSeries,
    pub rr_synth: RrSynthesizer,
    pub respiratory_rate: Option<f32>,
    pub voice: Option<VoiceState>,
    /// Voice set from the most recent block, taken by the next cycle
    pub latest_voice: Option<VoiceBiomarkerSet>,
    pub audio_seen: bool,
    pub clock: TimestampLog,
    /// Frames accepted into the window
    pub frame_number: u64,
}

impl SessionState {
    pub fn new(config: &BiosenseConfig) -> Self {
        let capacity = config.conditioner.window_capacity;
        Self {
            window: SignalWindow::new(capacity),
            red: RingBuffer::new(capacity),
            blue: RingBuffer::new(capacity),
            quality: RingBuffer::new(capacity),
            hr_history: HeartRateHistory::new(config.validator.history_len),
            rr: RrIntervalSeries::new(config.rr.capacity),
            rr_synth: RrSynthesizer::new(config.rr.clone()),
            respiratory_rate: None,
            voice: None,
            latest_voice: None,
            audio_seen: false,
            clock: TimestampLog::new(),
            frame_number: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames_seen: u64,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    pub audio_blocks: u64,
    pub timestamp_regressions: u64,
    pub cycles: u64,
    pub snapshots_emitted: u64,
    pub snapshots_dropped: u64,
}

/// Result of one evaluation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Emitted,
    /// Snapshot built but the sink was busy
    Dropped,
    /// Nothing computable; no snapshot
    Empty,
}

#[derive(Debug)]
struct Pipeline {
    region: RegionExtractor,
    conditioner: SignalConditioner,
    analyzer: FrequencyAnalyzer,
    validator: TemporalValidator,
    hrv: HrvEngine,
    respiration: RespirationEstimator,
    vitals: VitalsEstimator,
    stress: StressEstimator,
    voice: VoiceEngine,
}

impl Pipeline {
    fn new(config: &BiosenseConfig) -> Self {
        Self {
            region: RegionExtractor::new(config.region.clone()),
            conditioner: SignalConditioner::new(config.conditioner.clone()),
            analyzer: FrequencyAnalyzer::new(config.frequency.clone()),
            validator: TemporalValidator::new(config.validator.clone()),
            hrv: HrvEngine::new(config.hrv.clone()),
            respiration: RespirationEstimator::new(config.respiration.clone()),
            vitals: VitalsEstimator::new(config.vitals.clone()),
            stress: StressEstimator::new(config.stress.clone()),
            voice: VoiceEngine::new(config.voice.clone()),
        }
    }
}

/// Keep an `Ok` value; log and trace a rejection.
fn settle<T>(
    trace: &mut TraceLog,
    ts_us: i64,
    category: TraceCategory,
    step: &str,
    result: Result<T, Rejection>,
    value: impl Fn(&T) -> f64,
) -> Option<T> {
    match result {
        Ok(v) => {
            trace.record(ts_us, category, step, "ok", Some(value(&v)));
            Some(v)
        }
        Err(rejection) => {
            debug!("{}: {}", step, rejection);
            trace.record(ts_us, category, step, rejection.to_string(), None);
            None
        }
    }
}

pub struct SessionController<F = NoSource, A = NoSource> {
    config: BiosenseConfig,
    pipeline: Pipeline,
    state: SessionState,
    frames: F,
    audio: A,
    sink: Box<dyn SnapshotSink + Send>,
    observers: Vec<Box<dyn StatusObserver + Send>>,
    status: SessionStatus,
    stop: StopHandle,
    stats: SessionStats,
    trace: TraceLog,
}

impl SessionController<NoSource, NoSource> {
    /// Session fed only through `push_frame` / `push_audio`.
    pub fn push_driven(
        config: BiosenseConfig,
        sink: impl SnapshotSink + Send + 'static,
    ) -> Result<Self, SessionError> {
        Self::new(config, NoSource, NoSource, sink)
    }
}

impl<F: FrameSource, A: AudioSource> SessionController<F, A> {
    pub fn new(
        config: BiosenseConfig,
        frames: F,
        audio: A,
        sink: impl SnapshotSink + Send + 'static,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let trace = TraceLog::new(config.diagnostics.enabled, config.diagnostics.capacity);
        Ok(Self {
            pipeline: Pipeline::new(&config),
            state: SessionState::new(&config),
            frames,
            audio,
            sink: Box::new(sink),
            observers: Vec::new(),
            status: SessionStatus::Accumulating,
            stop: StopHandle::new(),
            stats: SessionStats::default(),
            trace,
            config,
        })
    }

    /// Share an existing stop flag instead of the session's own.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn add_observer(&mut self, observer: impl StatusObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &BiosenseConfig {
        &self.config
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn trace_mut(&mut self) -> &mut TraceLog {
        &mut self.trace
    }

    /// Raise the stop flag; takes effect at the next tick.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Pull one frame, one audio block (when enabled) and run an
    /// evaluation cycle if one is due in data time.
    ///
    /// The stop flag is checked once, here; a stop raised while the tick is
    /// in flight takes effect at the next tick.
    ///
    /// Returns the cycle outcome when a cycle ran.
    pub fn tick(&mut self) -> Result<Option<CycleOutcome>, SessionError> {
        self.ensure_running()?;
        self.pull_frame()?;
        if self.config.session.audio_enabled {
            self.pull_audio()?;
        }
        match self.evaluation_due() {
            Some(now_us) => Ok(Some(self.evaluate(now_us))),
            None => Ok(None),
        }
    }

    /// Pull and process one frame; `false` when the source had none.
    pub fn tick_frame(&mut self) -> Result<bool, SessionError> {
        self.ensure_running()?;
        self.pull_frame()
    }

    /// Pull and process one audio block; `false` when the source had none.
    pub fn tick_audio(&mut self) -> Result<bool, SessionError> {
        self.ensure_running()?;
        self.pull_audio()
    }

    pub fn push_frame(&mut self, frame: &VideoFrame) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.ingest_frame(frame);
        Ok(())
    }

    pub fn push_audio(&mut self, block: &AudioBlock) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.ingest_audio(block);
        Ok(())
    }

    /// Data time at which the next cycle is due, if it is due now.
    pub fn evaluation_due(&self) -> Option<i64> {
        let now = self.state.clock.latest_input()?;
        let since = self
            .state
            .clock
            .last_evaluation
            .or(self.state.clock.session_start)?;
        let interval_us = (self.config.session.evaluation_interval_ms as i64).saturating_mul(1000);
        (now - since >= interval_us).then_some(now)
    }

    /// Run one evaluation cycle at data time `now_us`.
    pub fn tick_evaluate(&mut self, now_us: i64) -> Result<CycleOutcome, SessionError> {
        self.ensure_running()?;
        Ok(self.evaluate(now_us))
    }

    fn evaluate(&mut self, now_us: i64) -> CycleOutcome {
        let elapsed_s = match self.state.clock.update_evaluation(now_us) {
            Ok(dt) => dt,
            Err(e) => {
                warn!("{}", e);
                self.stats.timestamp_regressions += 1;
                return CycleOutcome::Empty;
            }
        };
        self.stats.cycles += 1;

        let window_ready = self.pipeline.conditioner.status(&self.state.window) == ConditionerStatus::Ready;
        if window_ready || self.state.audio_seen {
            self.set_status(SessionStatus::Analyzing, now_us);
        }

        let mut rppg = RppgBiomarkers::default();
        let mut hr_quality = None;
        if window_ready {
            hr_quality = self.evaluate_rppg(now_us, elapsed_s, &mut rppg);
        }
        let voice = self.state.latest_voice.take().unwrap_or_default();
        if rppg.heart_rate_bpm.is_some() {
            self.assess_stress(now_us, &mut rppg, &voice);
        }

        let calculated_count = rppg.count() + voice.count();
        if calculated_count == 0 {
            debug!("cycle at {}us: nothing computed", now_us);
            self.trace
                .record(now_us, TraceCategory::Session, "emit", "empty cycle", None);
            return CycleOutcome::Empty;
        }

        let quality_score = hr_quality.unwrap_or_else(|| self.mean_extraction_quality());
        let snapshot = BiomarkerSnapshot {
            rppg,
            voice,
            calculated_count,
            quality_score,
            ts_us: now_us,
            frame_number: self.state.frame_number,
        };
        self.trace.record(
            now_us,
            TraceCategory::Session,
            "emit",
            "snapshot",
            Some(calculated_count as f64),
        );
        match self.sink.deliver(snapshot) {
            Delivery::Delivered => {
                self.stats.snapshots_emitted += 1;
                CycleOutcome::Emitted
            }
            Delivery::Dropped => {
                self.stats.snapshots_dropped += 1;
                CycleOutcome::Dropped
            }
        }
    }

    fn pull_frame(&mut self) -> Result<bool, SessionError> {
        match self.frames.next_frame() {
            Ok(Some(frame)) => {
                self.ingest_frame(&frame);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(self.fail(Device::Camera, e.to_string())),
        }
    }

    fn pull_audio(&mut self) -> Result<bool, SessionError> {
        match self.audio.next_audio_block() {
            Ok(Some(block)) => {
                self.ingest_audio(&block);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(self.fail(Device::Microphone, e.to_string())),
        }
    }

    fn ensure_running(&mut self) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::Stopped);
        }
        if self.stop.is_stopped() {
            let ts = self.state.clock.latest_input().unwrap_or(0);
            self.set_status(SessionStatus::Stopped, ts);
            return Err(SessionError::Stopped);
        }
        Ok(())
    }

    fn fail(&mut self, device: Device, reason: String) -> SessionError {
        warn!("{} failed: {}", device, reason);
        let ts = self.state.clock.latest_input().unwrap_or(0);
        self.set_status(SessionStatus::Failed(format!("{device}: {reason}")), ts);
        SessionError::DeviceUnavailable { device, reason }
    }

    fn set_status(&mut self, status: SessionStatus, ts_us: i64) {
        if self.status == status {
            return;
        }
        info!("session status {:?} -> {:?}", self.status, status);
        self.trace.record(
            ts_us,
            TraceCategory::Session,
            "status",
            format!("{:?}", status),
            None,
        );
        self.status = status;
        for observer in &mut self.observers {
            observer.on_status(&self.status);
        }
    }

    fn ingest_frame(&mut self, frame: &VideoFrame) {
        self.stats.frames_seen += 1;
        if let Err(e) = self.state.clock.update_frame(frame.ts_us) {
            warn!("{}", e);
            self.stats.timestamp_regressions += 1;
            self.stats.frames_rejected += 1;
            return;
        }

        let accepted = self
            .pipeline
            .region
            .extract(frame)
            .and_then(|sample| self.pipeline.conditioner.accept(&sample).map(|g| (sample, g)));
        let (sample, green) = match accepted {
            Ok(v) => v,
            Err(rejection) => {
                log::trace!("frame {} rejected: {}", frame.ts_us, rejection);
                self.trace.record(
                    frame.ts_us,
                    TraceCategory::Video,
                    "extract",
                    rejection.to_string(),
                    None,
                );
                self.stats.frames_rejected += 1;
                return;
            }
        };

        self.stats.frames_accepted += 1;
        self.state.frame_number += 1;
        self.state.window.push(green);
        self.state.red.push(sample.r);
        self.state.blue.push(sample.b);
        self.state.quality.push(sample.quality);
        self.trace.record(
            frame.ts_us,
            TraceCategory::Video,
            "extract",
            "accepted",
            Some(sample.quality as f64),
        );

        if self.status == SessionStatus::Accumulating
            && self.pipeline.conditioner.status(&self.state.window) == ConditionerStatus::Ready
        {
            self.set_status(SessionStatus::Ready, frame.ts_us);
        }
    }

    fn ingest_audio(&mut self, block: &AudioBlock) {
        self.stats.audio_blocks += 1;
        if let Err(e) = self.state.clock.update_audio(block.ts_us) {
            warn!("{}", e);
            self.stats.timestamp_regressions += 1;
            return;
        }
        let frame = match VoiceFrame::from_block(block) {
            Ok(frame) => frame,
            Err(rejection) => {
                debug!("audio block {} rejected: {}", block.ts_us, rejection);
                return;
            }
        };
        self.state.audio_seen = true;

        if self.state.voice.is_none() {
            self.state.voice = Some(self.pipeline.voice.new_state(frame.sample_rate));
        }
        if let Some(voice_state) = self.state.voice.as_mut() {
            let set = self.pipeline.voice.process(voice_state, &frame);
            self.trace.record(
                block.ts_us,
                TraceCategory::Voice,
                "process",
                "block",
                Some(set.count() as f64),
            );
            self.state.latest_voice = Some(set);
        }
    }

    fn mean_extraction_quality(&self) -> f32 {
        let n = self.config.conditioner.analysis_window;
        let recent: Vec<f32> = self.state.quality.recent(n).copied().collect();
        stats::mean(&recent).unwrap_or(0.0)
    }

    /// Heart-rate core plus everything gated on an accepted heart rate.
    /// Returns the accepted estimate's quality.
    fn evaluate_rppg(&mut self, now_us: i64, elapsed_s: f32, out: &mut RppgBiomarkers) -> Option<f32> {
        let trace = &mut self.trace;
        let p = &mut self.pipeline;
        let state = &mut self.state;

        let conditioned = settle(
            trace,
            now_us,
            TraceCategory::Rppg,
            "condition",
            p.conditioner.condition(&state.window),
            |c| c.samples.len() as f64,
        )?;
        out.motion_artifact = Some(conditioned.motion_artifact());

        let n = conditioned.samples.len();
        let recent_quality: Vec<f32> = state.quality.recent(n).copied().collect();
        let extraction_quality = stats::mean(&recent_quality).unwrap_or(0.0);

        let raw = settle(
            trace,
            now_us,
            TraceCategory::Rppg,
            "frequency",
            p.analyzer.estimate(&conditioned, extraction_quality, now_us),
            |e| e.bpm as f64,
        )?;
        let validated = p.validator.update(&mut state.hr_history, raw);
        let bpm = validated.estimate.bpm;
        debug!(
            "heart rate raw {} -> {} BPM ({:?}, quality {:.2})",
            validated.raw_bpm, bpm, validated.path, validated.estimate.quality
        );
        trace.record(now_us, TraceCategory::Rppg, "validate", format!("{:?}", validated.path), Some(bpm as f64));
        out.heart_rate_bpm = Some(bpm);
        out.heart_rate_quality = Some(validated.estimate.quality);

        let green = state.window.snapshot();
        if let Some(resp) = settle(
            trace,
            now_us,
            TraceCategory::Vitals,
            "respiration",
            p.respiration.estimate(&green),
            |r| r.rate as f64,
        ) {
            out.respiratory_rate = Some(resp.rate);
            out.respiratory_confidence = Some(resp.confidence);
            state.respiratory_rate = Some(resp.rate);
        }

        let appended = state.rr_synth.advance(
            &mut state.rr,
            bpm as f32,
            elapsed_s * 1000.0,
            state.respiratory_rate,
        );
        trace.record(now_us, TraceCategory::Hrv, "rr", "synthesized", Some(appended as f64));
        out.hrv = p.hrv.compute(&state.rr.snapshot());
        trace.record(now_us, TraceCategory::Hrv, "metrics", "computed", Some(out.hrv.count() as f64));

        out.spo2_percent = settle(
            trace,
            now_us,
            TraceCategory::Vitals,
            "spo2",
            p.vitals.spo2(&state.red.snapshot(), &state.blue.snapshot()),
            |v| *v as f64,
        );
        if let Some(bp) = settle(
            trace,
            now_us,
            TraceCategory::Vitals,
            "blood_pressure",
            p.vitals.blood_pressure(bpm as f32, out.hrv.rmssd_ms),
            |bp| bp.systolic as f64,
        ) {
            out.systolic_mmhg = Some(bp.systolic);
            out.diastolic_mmhg = Some(bp.diastolic);
        }
        out.perfusion_index = settle(
            trace,
            now_us,
            TraceCategory::Vitals,
            "perfusion",
            p.vitals.perfusion_index(&green, extraction_quality),
            |v| *v as f64,
        );

        Some(validated.estimate.quality)
    }

    fn assess_stress(&mut self, now_us: i64, out: &mut RppgBiomarkers, voice: &VoiceBiomarkerSet) {
        let inputs = StressInputs {
            heart_rate_bpm: out.heart_rate_bpm.map(|b| b as f32),
            rmssd_ms: out.hrv.rmssd_ms,
            sdnn_ms: out.hrv.sdnn_ms,
            lf_hf_ratio: out.hrv.lf_hf_ratio,
            vocal_stress: voice.vocal_stress,
        };
        if let Some(assessment) = self.pipeline.stress.assess(&inputs) {
            out.stress_score = Some(assessment.score);
            out.stress_level = Some(assessment.level);
            self.trace.record(
                now_us,
                TraceCategory::Vitals,
                "stress",
                format!("{:?}", assessment.level),
                Some(assessment.score as f64),
            );
        }
    }
}
