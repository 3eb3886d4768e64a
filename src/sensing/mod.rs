pub mod buffer;
pub mod classifier;
pub mod commands;
pub mod controller;
mod loop_worker;
pub mod packet;

pub use buffer::{Sample, Window, WindowBuffer, WINDOW_CAPACITY};
pub use classifier::{ClassificationResult, FatigueLabel, RealtimeClassifier};
pub use controller::{BufferKey, IngestWorker, LivePrediction, ReadingStatus, SensingController};
pub use loop_worker::ingest_loop;
pub use packet::SensorPacket;
