//! Meeting session composition root.
//!
//! Joins the two independent branches of the pipeline — acoustic clustering
//! (device → feature extractor → clusterer) and speech-to-text (engine →
//! recognition session → store) — on a single serialized event loop, so store
//! and clusterer mutations never race. The branches meet only at utterance
//! finalization, where the clusterer's current speaker is attached to the
//! finalized text.

use crate::audio::device::{AudioDevice, CaptureMode};
use crate::audio::features::FeatureExtractor;
use crate::config::Config;
use crate::diarize::clusterer::SpeakerClusterer;
use crate::diarize::speaker::{SpeakerId, SpeakerSummary};
use crate::error::{ConfabError, Result};
use crate::recognize::engine::{EngineEvent, EngineFactory, RecognitionEngine};
use crate::recognize::session::{
    InterimUtterance, RecognitionSession, SessionOutput, SessionStatus,
};
use crate::report::{LogReporter, Reporter};
use crate::transcript::snapshot::{SnapshotStore, save_snapshot};
use crate::transcript::store::{TranscriptStats, Utterance, UtteranceStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Events surfaced to observers of a running meeting.
#[derive(Debug, Clone)]
pub enum MeetingEvent {
    /// A finalized, speaker-attributed utterance was stored.
    Utterance(Utterance),
    /// The interim preview changed.
    Interim(InterimUtterance),
    /// Current input level in [0, 100], once per analysis tick.
    Level(f32),
    /// Recognition status changed.
    Status(SessionStatus),
    /// The active speaker changed.
    SpeakerChanged(SpeakerId),
    /// A transient condition was reported; the meeting keeps running.
    Error(String),
    /// A fatal condition stopped the meeting.
    Fatal(String),
    /// The meeting loop has torn down.
    Stopped,
}

/// An owned meeting session.
///
/// There is no global current-session state: independent sessions are
/// independent instances, each with its own store and clusterer.
pub struct MeetingSession {
    config: Config,
    store: Arc<Mutex<UtteranceStore>>,
    clusterer: Arc<Mutex<SpeakerClusterer>>,
    reporter: Arc<dyn Reporter>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    event_tx: Option<crossbeam_channel::Sender<MeetingEvent>>,
    running: Arc<AtomicBool>,
    stop_tx: Option<mpsc::UnboundedSender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MeetingSession {
    /// Creates a session from configuration.
    pub fn new(config: Config) -> Self {
        let store = UtteranceStore::new(&config.recognition.language);
        let clusterer = SpeakerClusterer::new(config.diarization.clone());
        Self {
            config,
            store: Arc::new(Mutex::new(store)),
            clusterer: Arc::new(Mutex::new(clusterer)),
            reporter: Arc::new(LogReporter),
            snapshots: None,
            event_tx: None,
            running: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            task: None,
        }
    }

    /// Sets a custom reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Streams meeting events to the given channel, non-blocking: events are
    /// dropped rather than stalling the loop when the receiver lags.
    pub fn with_event_sender(mut self, tx: crossbeam_channel::Sender<MeetingEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Enables periodic auto-save to the given snapshot store.
    pub fn with_snapshot_store(mut self, snapshots: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Starts capture and recognition.
    ///
    /// Opens the device (which may wait briefly for capture permission),
    /// then spawns the event loop. Returns immediately afterwards; all further
    /// outcomes are delivered as [`MeetingEvent`]s.
    pub fn start<D, F>(&mut self, mut device: D, factory: F, mode: CaptureMode) -> Result<()>
    where
        D: AudioDevice + 'static,
        F: EngineFactory + 'static,
    {
        if self.running.load(Ordering::SeqCst) {
            return Err(ConfabError::SessionActive);
        }

        device.open(mode)?;
        lock(&self.store).mark_started();
        self.running.store(true, Ordering::SeqCst);

        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        self.stop_tx = Some(stop_tx);

        let meeting_loop = MeetingLoop {
            config: self.config.clone(),
            extractor: FeatureExtractor::new(device.sample_rate()),
            device,
            factory: Box::new(factory),
            session: RecognitionSession::new(self.config.recognition.clone()),
            engine: None,
            store: Arc::clone(&self.store),
            clusterer: Arc::clone(&self.clusterer),
            snapshots: self.snapshots.clone(),
            reporter: Arc::clone(&self.reporter),
            event_tx: self.event_tx.clone(),
            running: Arc::clone(&self.running),
            last_speaker: None,
        };
        self.task = Some(tokio::spawn(meeting_loop.run(stop_rx)));
        Ok(())
    }

    /// Requests a cooperative stop. Returns immediately; the loop tears down
    /// the engine and device and then emits [`MeetingEvent::Stopped`].
    pub fn stop(&self) {
        if let Some(tx) = &self.stop_tx {
            let _ = tx.send(());
        }
    }

    /// Waits for the event loop to finish tearing down.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// True while the event loop is live.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Renames a speaker and backfills the name onto stored utterances.
    pub fn rename_speaker(&self, id: SpeakerId, name: &str) -> bool {
        let renamed = lock(&self.clusterer).rename(id, name);
        if renamed {
            lock(&self.store).set_speaker_name(id, name);
        }
        renamed
    }

    /// Inserts a speaker label with no acoustic data.
    pub fn add_manual_speaker(&self, name: Option<&str>) -> SpeakerId {
        lock(&self.clusterer).add_manual_speaker(name)
    }

    /// Toggles diarization; while disabled the session runs single-speaker.
    pub fn set_diarization_enabled(&self, enabled: bool) {
        lock(&self.clusterer).set_enabled(enabled);
    }

    /// Discards the transcript and all speaker state together.
    pub fn clear_transcript(&self) {
        lock(&self.store).clear();
        lock(&self.clusterer).reset();
    }

    /// Summaries of all known speakers.
    pub fn speakers(&self) -> Vec<SpeakerSummary> {
        lock(&self.clusterer).stats()
    }

    /// Aggregate transcript statistics.
    pub fn stats(&self) -> TranscriptStats {
        lock(&self.store).stats()
    }

    /// Plain-text transcript.
    pub fn export_text(&self) -> String {
        lock(&self.store).export_text()
    }

    /// Structured JSON transcript (canonical archival format).
    pub fn export_structured(&self) -> Result<String> {
        lock(&self.store).export_structured()
    }

    /// SRT subtitle transcript.
    pub fn export_subtitle(&self) -> String {
        lock(&self.store).export_subtitle()
    }

    /// Shared handle to the utterance store.
    pub fn store(&self) -> Arc<Mutex<UtteranceStore>> {
        Arc::clone(&self.store)
    }

    /// Shared handle to the speaker clusterer.
    pub fn clusterer(&self) -> Arc<Mutex<SpeakerClusterer>> {
        Arc::clone(&self.clusterer)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Flow {
    Continue,
    Break,
}

/// The single serialized event loop of a running meeting.
struct MeetingLoop<D: AudioDevice> {
    config: Config,
    device: D,
    extractor: FeatureExtractor,
    factory: Box<dyn EngineFactory>,
    session: RecognitionSession,
    engine: Option<Box<dyn RecognitionEngine>>,
    store: Arc<Mutex<UtteranceStore>>,
    clusterer: Arc<Mutex<SpeakerClusterer>>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    reporter: Arc<dyn Reporter>,
    event_tx: Option<crossbeam_channel::Sender<MeetingEvent>>,
    running: Arc<AtomicBool>,
    last_speaker: Option<SpeakerId>,
}

impl<D: AudioDevice> MeetingLoop<D> {
    async fn run(mut self, mut stop_rx: mpsc::UnboundedReceiver<()>) {
        let (engine_tx, mut engine_rx) = mpsc::unbounded_channel::<EngineEvent>();

        // Division keeps the period non-zero (and exact at 60 Hz) for any rate.
        let tick_period = Duration::from_secs(1) / self.config.audio.tick_hz.max(1);
        let mut tick = tokio::time::interval(tick_period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let auto_save_enabled = self.config.session.auto_save && self.snapshots.is_some();
        let auto_save_period =
            Duration::from_secs(self.config.session.auto_save_interval_secs.max(1));
        let mut auto_save = tokio::time::interval_at(
            tokio::time::Instant::now() + auto_save_period,
            auto_save_period,
        );

        // One reusable timer for the bounded restart delay, armed on demand.
        let restart_delay = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(restart_delay);
        let mut restart_armed = false;

        let outputs = self.session.start();
        if let (Flow::Break, _) = self.apply(outputs, &engine_tx) {
            self.teardown(auto_save_enabled);
            return;
        }

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if self.device.track_ended() {
                        let error = ConfabError::DeviceUnavailable {
                            message: "capture track ended".to_string(),
                        };
                        self.reporter.report("audio", &error.to_string());
                        self.emit(MeetingEvent::Fatal(error.to_string()));
                        let outputs = self.session.stop();
                        let _ = self.apply(outputs, &engine_tx);
                        break;
                    }
                    self.on_tick();
                }
                Some(event) = engine_rx.recv() => {
                    let outputs = self.session.handle_event(event);
                    let (flow, restart) = self.apply(outputs, &engine_tx);
                    if let Some(delay) = restart {
                        restart_delay
                            .as_mut()
                            .reset(tokio::time::Instant::now() + delay);
                        restart_armed = true;
                    }
                    if let Flow::Break = flow {
                        break;
                    }
                }
                () = &mut restart_delay, if restart_armed => {
                    restart_armed = false;
                    if !self.start_engine(&engine_tx) {
                        break;
                    }
                }
                _ = auto_save.tick(), if auto_save_enabled => {
                    self.auto_save();
                }
                _ = stop_rx.recv() => {
                    let outputs = self.session.stop();
                    let _ = self.apply(outputs, &engine_tx);
                    break;
                }
            }
        }

        self.teardown(auto_save_enabled);
    }

    /// Executes state machine outputs. Returns the loop flow and a restart
    /// delay to arm, if requested.
    fn apply(
        &mut self,
        outputs: Vec<SessionOutput>,
        engine_tx: &mpsc::UnboundedSender<EngineEvent>,
    ) -> (Flow, Option<Duration>) {
        let mut restart = None;
        for output in outputs {
            match output {
                SessionOutput::StartEngine => {
                    if !self.start_engine(engine_tx) {
                        return (Flow::Break, None);
                    }
                }
                SessionOutput::StopEngine => {
                    if let Some(engine) = &mut self.engine {
                        engine.stop();
                    }
                }
                SessionOutput::RestartEngine { delay } => {
                    // The dying instance is discarded; a fresh one is created
                    // once the delay elapses.
                    self.engine = None;
                    restart = Some(delay);
                }
                SessionOutput::Final(utterance) => {
                    let attributed = attribute_speaker(utterance, &mut lock(&self.clusterer));
                    let stored = {
                        let mut store = lock(&self.store);
                        let id = store.append(attributed);
                        store.get(id).cloned()
                    };
                    if let Some(utterance) = stored {
                        self.emit(MeetingEvent::Utterance(utterance));
                    }
                }
                SessionOutput::Interim(interim) => {
                    self.emit(MeetingEvent::Interim(interim));
                }
                SessionOutput::Status(status) => {
                    self.emit(MeetingEvent::Status(status));
                }
                SessionOutput::Transient(error) => {
                    let message = format!("transient engine condition: {:?}", error);
                    self.reporter.report("recognition", &message);
                    self.emit(MeetingEvent::Error(message));
                }
                SessionOutput::Fatal(error) => {
                    self.reporter.report("recognition", &error.to_string());
                    self.emit(MeetingEvent::Fatal(error.to_string()));
                    return (Flow::Break, None);
                }
            }
        }
        (Flow::Continue, restart)
    }

    /// Creates and starts a fresh engine instance.
    fn start_engine(&mut self, engine_tx: &mpsc::UnboundedSender<EngineEvent>) -> bool {
        match self
            .factory
            .create(&self.config.recognition.language, engine_tx.clone())
        {
            Ok(mut engine) => match engine.start() {
                Ok(()) => {
                    self.engine = Some(engine);
                    true
                }
                Err(e) => {
                    self.reporter.report("recognition", &e.to_string());
                    self.emit(MeetingEvent::Fatal(e.to_string()));
                    false
                }
            },
            Err(e) => {
                self.reporter.report("recognition", &e.to_string());
                self.emit(MeetingEvent::Fatal(e.to_string()));
                false
            }
        }
    }

    /// One analysis tick: level metering plus speaker identification.
    fn on_tick(&mut self) {
        let Some(frame) = self.device.read_frame() else {
            return;
        };

        self.emit(MeetingEvent::Level(self.extractor.level(&frame)));

        let features = self.extractor.extract(&frame);
        let speaker = lock(&self.clusterer).identify(&features);
        if let Some(id) = speaker
            && self.last_speaker != Some(id)
        {
            self.last_speaker = Some(id);
            self.emit(MeetingEvent::SpeakerChanged(id));
        }
    }

    fn auto_save(&self) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        let result = save_snapshot(&lock(&self.store), snapshots.as_ref(), chrono::Utc::now());
        if let Err(e) = result {
            self.reporter
                .report("snapshot", &format!("auto-save failed: {}", e));
        }
    }

    fn teardown(&mut self, auto_save_enabled: bool) {
        if let Some(engine) = &mut self.engine {
            engine.stop();
        }
        self.engine = None;
        self.device.close();
        if auto_save_enabled {
            self.auto_save();
        }
        self.running.store(false, Ordering::SeqCst);
        self.emit(MeetingEvent::Stopped);
    }

    fn emit(&self, event: MeetingEvent) {
        if let Some(tx) = &self.event_tx {
            // Non-blocking by design; a lagging observer loses events instead
            // of stalling the loop.
            let _ = tx.try_send(event);
        }
    }
}

/// Attaches the clusterer's current speaker to a finalized utterance and bumps
/// that speaker's utterance count.
fn attribute_speaker(utterance: Utterance, clusterer: &mut SpeakerClusterer) -> Utterance {
    let Some(id) = clusterer.current_speaker() else {
        return utterance;
    };
    let name = clusterer.speaker_name(id).unwrap_or_default().to_string();
    clusterer.increment_utterance_count(id);
    utterance.with_speaker(id, &name)
}
