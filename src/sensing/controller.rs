use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::{ClassificationRecord, Database};
use crate::error::{PipelineError, PipelineResult};
use crate::metrics::{InferenceMetrics, MetricsCollector};

use super::buffer::{Window, WindowBuffer};
use super::classifier::{ClassificationResult, RealtimeClassifier};
use super::loop_worker::ingest_loop;
use super::packet::SensorPacket;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Identifies the buffer a packet lands in. Packets without a helmet id
/// share the anonymous buffer; they are classified but never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BufferKey {
    Helmet(String),
    Anonymous,
}

impl BufferKey {
    pub fn helmet(helmet_id: &str) -> Self {
        BufferKey::Helmet(helmet_id.to_string())
    }

    pub fn for_packet(packet: &SensorPacket) -> Self {
        match &packet.helmet_id {
            Some(id) => BufferKey::Helmet(id.clone()),
            None => BufferKey::Anonymous,
        }
    }

    pub fn helmet_id(&self) -> Option<&str> {
        match self {
            BufferKey::Helmet(id) => Some(id),
            BufferKey::Anonymous => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePrediction {
    pub helmet_id: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub result: ClassificationResult,
}

/// Outcome of one reading, or the current state of a helmet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ReadingStatus {
    #[serde(rename_all = "camelCase")]
    Collecting {
        helmet_id: Option<String>,
        progress: usize,
        capacity: usize,
    },
    Classified(LivePrediction),
}

#[derive(Default)]
struct HelmetState {
    buffer: WindowBuffer,
    session_id: Option<String>,
    /// Sequence number of the last pushed sample.
    sequence: u64,
    latest: Option<(u64, LivePrediction)>,
}

impl HelmetState {
    /// Keeps `prediction` unless a newer window already produced a result.
    fn offer(&mut self, sequence: u64, prediction: LivePrediction) -> bool {
        if prediction.session_id != self.session_id {
            return false;
        }
        if matches!(&self.latest, Some((stored, _)) if *stored >= sequence) {
            return false;
        }
        self.latest = Some((sequence, prediction));
        true
    }
}

/// Per-helmet buffers. Insert-and-snapshot happens under one lock.
#[derive(Default)]
struct SessionBuffers {
    helmets: HashMap<BufferKey, HelmetState>,
}

struct Snapshot {
    window: Option<Window>,
    progress: usize,
    capacity: usize,
    session_id: Option<String>,
    sequence: u64,
}

impl SessionBuffers {
    fn push(&mut self, key: &BufferKey, packet: &SensorPacket) -> Snapshot {
        let state = self.helmets.entry(key.clone()).or_default();
        let window = state.buffer.push(packet.sample());
        state.sequence += 1;
        Snapshot {
            window,
            progress: state.buffer.progress(),
            capacity: state.buffer.capacity(),
            session_id: state.session_id.clone(),
            sequence: state.sequence,
        }
    }
}

/// Realtime side of the pipeline: buffers readings per helmet, classifies
/// full windows and keeps the latest prediction for each helmet.
#[derive(Clone)]
pub struct SensingController {
    buffers: Arc<Mutex<SessionBuffers>>,
    classifier: RealtimeClassifier,
    db: Option<Database>,
    metrics: MetricsCollector,
    inference_timeout: Duration,
}

impl SensingController {
    pub fn new(
        classifier: RealtimeClassifier,
        metrics: MetricsCollector,
        inference_timeout: Duration,
    ) -> Self {
        Self {
            buffers: Arc::new(Mutex::new(SessionBuffers::default())),
            classifier,
            db: None,
            metrics,
            inference_timeout,
        }
    }

    /// Readings and classifications from identified helmets are written here.
    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn classifier(&self) -> &RealtimeClassifier {
        &self.classifier
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub async fn submit_reading(&self, packet: SensorPacket) -> PipelineResult<ReadingStatus> {
        if let Err(err) = packet.validate() {
            self.metrics.record_rejected_reading().await;
            return Err(err);
        }

        let started = Instant::now();
        let timestamp = Utc::now();
        let key = BufferKey::for_packet(&packet);
        let helmet_id = key.helmet_id().map(str::to_string);
        let label = helmet_id.as_deref().unwrap_or("<anonymous>");
        self.metrics.record_reading().await;

        if let Some(id) = &helmet_id {
            self.persist_reading(&packet, id, timestamp).await;
        }

        let snapshot = self.buffers.lock().await.push(&key, &packet);

        let Some(window) = snapshot.window else {
            return Ok(ReadingStatus::Collecting {
                helmet_id,
                progress: snapshot.progress,
                capacity: snapshot.capacity,
            });
        };

        let inference_start = Instant::now();
        let result = match self
            .classifier
            .classify_with_timeout(window, self.inference_timeout)
            .await
        {
            Ok(result) => result,
            Err(err @ PipelineError::InferenceTimeout { .. }) => {
                log_warn!("classification for helmet {} timed out: {}", label, err);
                self.metrics.record_timeout().await;
                return Err(err);
            }
            Err(err) => {
                log_error!("classification for helmet {} failed: {}", label, err);
                self.metrics.record_failure().await;
                return Err(err);
            }
        };
        let inference_ms = inference_start.elapsed().as_millis() as u64;

        if result.degraded {
            log_warn!("helmet {} classified in degraded mode", label);
        }

        let prediction = LivePrediction {
            helmet_id: helmet_id.clone(),
            session_id: snapshot.session_id.clone(),
            timestamp,
            result,
        };

        let db_write_ms = match &helmet_id {
            Some(id) => self.persist_classification(id, &prediction).await,
            None => None,
        };

        {
            let mut buffers = self.buffers.lock().await;
            // Restarted, ended or already overtaken by a newer window.
            if let Some(state) = buffers.helmets.get_mut(&key) {
                state.offer(snapshot.sequence, prediction.clone());
            }
        }

        self.metrics
            .record_inference(InferenceMetrics {
                timestamp,
                helmet_id,
                label: prediction.result.label,
                inference_ms,
                db_write_ms,
                total_ms: started.elapsed().as_millis() as u64,
                degraded: prediction.result.degraded,
            })
            .await;

        Ok(ReadingStatus::Classified(prediction))
    }

    /// Latest prediction for a helmet, or its buffer progress while the first
    /// window is still filling.
    pub async fn live_prediction(&self, helmet_id: &str) -> Result<ReadingStatus> {
        let key = BufferKey::helmet(helmet_id);
        {
            let buffers = self.buffers.lock().await;
            if let Some(state) = buffers.helmets.get(&key) {
                return Ok(match &state.latest {
                    Some((_, prediction)) => ReadingStatus::Classified(prediction.clone()),
                    None => ReadingStatus::Collecting {
                        helmet_id: Some(helmet_id.to_string()),
                        progress: state.buffer.progress(),
                        capacity: state.buffer.capacity(),
                    },
                });
            }
        }

        if let Some(db) = &self.db {
            let stored = db
                .get_latest_classification(helmet_id)
                .await
                .context("failed to load latest classification")?;
            if let Some(record) = stored {
                return Ok(ReadingStatus::Classified(LivePrediction {
                    helmet_id: Some(record.helmet_id.clone()),
                    session_id: record.session_id.clone(),
                    timestamp: record.timestamp,
                    result: record.result(),
                }));
            }
        }

        Ok(ReadingStatus::Collecting {
            helmet_id: Some(helmet_id.to_string()),
            progress: 0,
            capacity: WindowBuffer::default().capacity(),
        })
    }

    /// Clears the helmet's window and latest prediction and opens a new
    /// session for it.
    pub async fn start_session(&self, helmet_id: &str) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut buffers = self.buffers.lock().await;
        let state = buffers.helmets.entry(BufferKey::helmet(helmet_id)).or_default();
        state.buffer.reset();
        state.latest = None;
        state.session_id = Some(session_id.clone());
        log_info!("helmet {} started session {}", helmet_id, session_id);
        session_id
    }

    /// Drops all in-memory state for the helmet. Returns false when the helmet
    /// had none. Stored readings and classifications are kept.
    pub async fn end_session(&self, helmet_id: &str) -> bool {
        let removed = self
            .buffers
            .lock()
            .await
            .helmets
            .remove(&BufferKey::helmet(helmet_id));
        if let Some(state) = &removed {
            log_info!(
                "helmet {} ended session {}",
                helmet_id,
                state.session_id.as_deref().unwrap_or("<none>")
            );
        }
        removed.is_some()
    }

    pub async fn progress(&self, key: &BufferKey) -> usize {
        self.buffers
            .lock()
            .await
            .helmets
            .get(key)
            .map_or(0, |state| state.buffer.progress())
    }

    pub async fn tracked_helmets(&self) -> usize {
        self.buffers.lock().await.helmets.len()
    }

    async fn persist_reading(&self, packet: &SensorPacket, helmet_id: &str, timestamp: DateTime<Utc>) {
        let Some(db) = &self.db else { return };
        if let Err(err) = db.insert_reading(&packet.to_reading(helmet_id, timestamp)).await {
            log_error!("failed to persist reading for helmet {}: {err:?}", helmet_id);
            self.metrics.record_persist_failure().await;
        }
    }

    async fn persist_classification(&self, helmet_id: &str, prediction: &LivePrediction) -> Option<u64> {
        let db = self.db.as_ref()?;
        let start = Instant::now();
        let record = ClassificationRecord::from_result(
            helmet_id,
            prediction.session_id.clone(),
            prediction.timestamp,
            &prediction.result,
        );
        if let Err(err) = db.insert_classification(&record).await {
            log_error!("failed to persist classification for helmet {}: {err:?}", helmet_id);
            self.metrics.record_persist_failure().await;
        }
        Some(start.elapsed().as_millis() as u64)
    }
}

/// Background task draining a packet channel into a [`SensingController`].
pub struct IngestWorker {
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    packets: mpsc::Sender<SensorPacket>,
}

impl IngestWorker {
    pub fn start(
        controller: SensingController,
        queue_depth: usize,
    ) -> (Self, mpsc::Receiver<ReadingStatus>) {
        let (packet_tx, packet_rx) = mpsc::channel(queue_depth.max(1));
        let (status_tx, status_rx) = mpsc::channel(queue_depth.max(1));
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(ingest_loop(
            controller,
            packet_rx,
            cancel_token.clone(),
            status_tx,
        ));

        (
            Self {
                handle: Some(handle),
                cancel_token,
                packets: packet_tx,
            },
            status_rx,
        )
    }

    pub fn sender(&self) -> mpsc::Sender<SensorPacket> {
        self.packets.clone()
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle.await.context("ingest loop task failed to join")
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{classifier, FailingClassifier, FixedScores, SlowClassifier};
    use crate::model::{ClassificationModel, ModelHandle};
    use crate::sensing::buffer::WINDOW_CAPACITY;
    use crate::sensing::classifier::FatigueLabel;

    fn controller(model: ModelHandle<dyn ClassificationModel>) -> SensingController {
        SensingController::new(
            RealtimeClassifier::new(model),
            MetricsCollector::new(),
            Duration::from_secs(2),
        )
    }

    fn packet(helmet: Option<&str>) -> SensorPacket {
        SensorPacket::new(helmet.map(str::to_string), 152.0, 36.8)
    }

    async fn fill(controller: &SensingController, helmet: Option<&str>, n: usize) -> ReadingStatus {
        let mut last = None;
        for _ in 0..n {
            last = Some(controller.submit_reading(packet(helmet)).await.unwrap());
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn collects_until_window_is_full_then_classifies() {
        let ctl = controller(classifier(FixedScores(vec![0.1, 0.2, 0.7])));

        let status = fill(&ctl, Some("H1"), WINDOW_CAPACITY - 1).await;
        assert_eq!(
            status,
            ReadingStatus::Collecting {
                helmet_id: Some("H1".into()),
                progress: WINDOW_CAPACITY - 1,
                capacity: WINDOW_CAPACITY,
            }
        );

        let ReadingStatus::Classified(prediction) = fill(&ctl, Some("H1"), 1).await else {
            panic!("expected a classification once the window is full");
        };
        assert_eq!(prediction.result.label, FatigueLabel::Fatigue);
        assert!((prediction.result.confidence - 70.0).abs() < 1e-4);

        // Full buffers classify on every further reading.
        assert!(matches!(
            fill(&ctl, Some("H1"), 1).await,
            ReadingStatus::Classified(_)
        ));
        assert_eq!(ctl.progress(&BufferKey::helmet("H1")).await, WINDOW_CAPACITY);

        let snapshot = ctl.metrics().get_snapshot().await;
        assert_eq!(snapshot.reading_count, WINDOW_CAPACITY as u64 + 1);
        assert_eq!(snapshot.classification_count, 2);
    }

    #[tokio::test]
    async fn helmets_have_independent_buffers() {
        let ctl = controller(classifier(FixedScores(vec![1.0, 0.0, 0.0])));
        fill(&ctl, Some("A"), 60).await;
        fill(&ctl, Some("B"), 10).await;
        fill(&ctl, None, 5).await;

        assert_eq!(ctl.progress(&BufferKey::helmet("A")).await, 60);
        assert_eq!(ctl.progress(&BufferKey::helmet("B")).await, 10);
        assert_eq!(ctl.progress(&BufferKey::Anonymous).await, 5);
        assert_eq!(ctl.progress(&BufferKey::helmet("C")).await, 0);
    }

    #[tokio::test]
    async fn live_prediction_reports_progress_then_latest_result() {
        let ctl = controller(classifier(FixedScores(vec![0.2, 0.5, 0.3])));
        assert_eq!(
            ctl.live_prediction("H1").await.unwrap(),
            ReadingStatus::Collecting {
                helmet_id: Some("H1".into()),
                progress: 0,
                capacity: WINDOW_CAPACITY,
            }
        );

        fill(&ctl, Some("H1"), WINDOW_CAPACITY).await;
        let ReadingStatus::Classified(prediction) = ctl.live_prediction("H1").await.unwrap() else {
            panic!("expected latest prediction");
        };
        assert_eq!(prediction.result.label, FatigueLabel::Stressed);
    }

    #[tokio::test]
    async fn start_session_resets_buffer_and_prediction() {
        let ctl = controller(classifier(FixedScores(vec![0.2, 0.5, 0.3])));
        fill(&ctl, Some("H1"), WINDOW_CAPACITY).await;

        let session_id = ctl.start_session("H1").await;
        assert_eq!(ctl.progress(&BufferKey::helmet("H1")).await, 0);
        assert!(matches!(
            ctl.live_prediction("H1").await.unwrap(),
            ReadingStatus::Collecting { progress: 0, .. }
        ));

        let ReadingStatus::Classified(prediction) = fill(&ctl, Some("H1"), WINDOW_CAPACITY).await
        else {
            panic!("expected a classification");
        };
        assert_eq!(prediction.session_id, Some(session_id));
    }

    #[tokio::test]
    async fn missing_model_degrades_instead_of_failing() {
        let ctl = controller(ModelHandle::unavailable("weights not found"));
        let ReadingStatus::Classified(prediction) = fill(&ctl, Some("H1"), WINDOW_CAPACITY).await
        else {
            panic!("expected a degraded classification");
        };
        assert!(prediction.result.degraded);
        assert_eq!(prediction.result.label, FatigueLabel::Error);
        assert_eq!(ctl.metrics().get_snapshot().await.degraded_count, 1);
    }

    #[tokio::test]
    async fn inference_errors_and_timeouts_propagate() {
        let failing = controller(classifier(FailingClassifier));
        fill(&failing, Some("H1"), WINDOW_CAPACITY - 1).await;
        assert!(matches!(
            failing.submit_reading(packet(Some("H1"))).await,
            Err(PipelineError::ModelInference(_))
        ));
        assert_eq!(failing.metrics().get_snapshot().await.failure_count, 1);

        let slow = SensingController::new(
            RealtimeClassifier::new(classifier(SlowClassifier(Duration::from_millis(300)))),
            MetricsCollector::new(),
            Duration::from_millis(20),
        );
        fill(&slow, Some("H1"), WINDOW_CAPACITY - 1).await;
        assert!(matches!(
            slow.submit_reading(packet(Some("H1"))).await,
            Err(PipelineError::InferenceTimeout { timeout_ms: 20 })
        ));
        assert_eq!(slow.metrics().get_snapshot().await.timeout_count, 1);
    }

    #[tokio::test]
    async fn invalid_packets_are_rejected_without_buffering() {
        let ctl = controller(classifier(FixedScores(vec![1.0, 0.0, 0.0])));
        let bad = SensorPacket::new(Some("H1".into()), f64::INFINITY, 36.0);
        assert!(matches!(
            ctl.submit_reading(bad).await,
            Err(PipelineError::InvalidPacket { field: "heart_rate", .. })
        ));
        assert_eq!(ctl.progress(&BufferKey::helmet("H1")).await, 0);
        assert_eq!(ctl.metrics().get_snapshot().await.rejected_reading_count, 1);
    }

    #[tokio::test]
    async fn identified_helmets_are_persisted() {
        let db = Database::in_memory().unwrap();
        let ctl = controller(classifier(FixedScores(vec![0.6, 0.3, 0.1]))).with_database(db.clone());

        fill(&ctl, Some("H1"), WINDOW_CAPACITY).await;
        fill(&ctl, None, 3).await;

        assert_eq!(db.count_readings("H1").await.unwrap(), WINDOW_CAPACITY as u64);
        assert_eq!(db.count_readings("anonymous").await.unwrap(), 0);

        let stored = db.get_latest_classification("H1").await.unwrap().unwrap();
        assert_eq!(stored.label, FatigueLabel::Normal);

        // A fresh controller falls back to the stored prediction.
        let restarted = controller(classifier(FixedScores(vec![0.6, 0.3, 0.1]))).with_database(db);
        assert!(matches!(
            restarted.live_prediction("H1").await.unwrap(),
            ReadingStatus::Classified(LivePrediction { ref helmet_id, .. })
                if helmet_id.as_deref() == Some("H1")
        ));
    }

    #[tokio::test]
    async fn helmet_named_anonymous_does_not_share_the_idless_buffer() {
        let db = Database::in_memory().unwrap();
        let ctl = controller(classifier(FixedScores(vec![1.0, 0.0, 0.0]))).with_database(db.clone());
        fill(&ctl, Some("anonymous"), 4).await;
        fill(&ctl, None, 7).await;

        assert_eq!(ctl.progress(&BufferKey::helmet("anonymous")).await, 4);
        assert_eq!(ctl.progress(&BufferKey::Anonymous).await, 7);
        assert_eq!(db.count_readings("anonymous").await.unwrap(), 4);

        let status = fill(&ctl, None, 1).await;
        assert!(matches!(status, ReadingStatus::Collecting { helmet_id: None, progress: 8, .. }));
    }

    #[tokio::test]
    async fn end_session_releases_helmet_state() {
        let ctl = controller(classifier(FixedScores(vec![1.0, 0.0, 0.0])));
        for helmet in ["A", "B", "C"] {
            fill(&ctl, Some(helmet), 3).await;
        }
        assert_eq!(ctl.tracked_helmets().await, 3);

        assert!(ctl.end_session("B").await);
        assert!(!ctl.end_session("B").await);
        assert_eq!(ctl.tracked_helmets().await, 2);
        assert_eq!(ctl.progress(&BufferKey::helmet("B")).await, 0);
        assert_eq!(ctl.progress(&BufferKey::helmet("A")).await, 3);
    }

    /// Slow on windows whose newest heart rate is 100, fast otherwise.
    struct SlowOnMarker;

    impl ClassificationModel for SlowOnMarker {
        fn predict(&self, window: &Window) -> PipelineResult<Vec<f32>> {
            let newest = window.rows().last().map_or(0.0, |row| row[0]);
            if newest == 100.0 {
                std::thread::sleep(Duration::from_millis(300));
                Ok(vec![1.0, 0.0, 0.0])
            } else {
                Ok(vec![0.0, 0.0, 1.0])
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn slow_older_window_does_not_replace_newer_prediction() {
        let ctl = controller(classifier(SlowOnMarker));
        fill(&ctl, Some("H1"), WINDOW_CAPACITY - 1).await;

        let older = {
            let ctl = ctl.clone();
            tokio::spawn(async move {
                ctl.submit_reading(SensorPacket::new(Some("H1".into()), 100.0, 36.8))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let newer = ctl.submit_reading(packet(Some("H1"))).await.unwrap();
        let older = older.await.unwrap().unwrap();

        let (ReadingStatus::Classified(newer), ReadingStatus::Classified(older)) = (newer, older)
        else {
            panic!("both readings complete a window");
        };
        assert_eq!(newer.result.label, FatigueLabel::Fatigue);
        assert_eq!(older.result.label, FatigueLabel::Normal);

        let ReadingStatus::Classified(live) = ctl.live_prediction("H1").await.unwrap() else {
            panic!("expected latest prediction");
        };
        assert_eq!(live, newer);
    }
}
