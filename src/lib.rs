pub mod cli;
mod db;
pub mod error;
mod metrics;
pub mod model;
pub mod sensing;
mod settings;
mod utils;
pub mod weekly;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

pub use db::{ClassificationRecord, DailyKpiRecord, Database, Reading};
pub use error::{PipelineError, PipelineResult};
pub use metrics::{InferenceMetrics, MetricsCollector, MetricsSnapshot};
use model::{load_classifier, load_forecaster, ClassificationModel, ModelHandle, RegressionModel};
use sensing::{RealtimeClassifier, SensingController};
pub use settings::{AppSettings, SettingsStore};
use weekly::{WeeklyConfig, WeeklyPipeline};

const DATA_DIR_ENV: &str = "SPY_HELMET_DATA_DIR";
const DEBUG_ENV: &str = "SPY_HELMET_DEBUG";
const DEFAULT_DATA_DIR: &str = "data";

/// Everything a command needs: storage, settings and both pipelines wired to
/// the loaded models.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    pub sensing: SensingController,
    pub weekly: WeeklyPipeline,
    pub metrics: MetricsCollector,
    data_dir: PathBuf,
}

impl AppState {
    /// Opens the database and settings under `data_dir` and loads both models.
    /// Missing model files leave the matching pipeline in degraded mode.
    pub fn initialize(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))
            .context("failed to initialize settings store")?;
        let db = Database::new(data_dir.join("spy-helmet.sqlite3"))
            .context("failed to initialize database")?;

        let current = settings.get();
        let classifier = load_classifier(&settings.resolve(&data_dir, &current.classifier_model_path));
        let forecaster = load_forecaster(&settings.resolve(&data_dir, &current.forecast_model_path));

        Ok(Self::from_parts(data_dir, db, settings, classifier, forecaster))
    }

    pub fn from_parts(
        data_dir: PathBuf,
        db: Database,
        settings: SettingsStore,
        classifier: ModelHandle<dyn ClassificationModel>,
        forecaster: ModelHandle<dyn RegressionModel>,
    ) -> Self {
        let current = settings.get();
        let metrics = MetricsCollector::new();

        let mut sensing = SensingController::new(
            RealtimeClassifier::new(classifier),
            metrics.clone(),
            current.inference_timeout(),
        );
        if current.persist_readings {
            sensing = sensing.with_database(db.clone());
        }

        Self {
            db,
            settings,
            sensing,
            weekly: WeeklyPipeline::new(forecaster, WeeklyConfig::default()),
            metrics,
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Data directory from `SPY_HELMET_DATA_DIR`, or `./data`.
pub fn data_dir_from_env() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Initializes `env_logger`. `RUST_LOG` wins over the default level, which is
/// `Debug` when `SPY_HELMET_DEBUG` is set to `1` or `true`.
pub fn init_logging() {
    let debug = std::env::var(DEBUG_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

pub fn run(data_dir: PathBuf) -> Result<AppState> {
    init_logging();
    let state = AppState::initialize(data_dir)?;
    info!("SPY helmet pipeline ready (data dir {})", state.data_dir().display());
    Ok(state)
}
