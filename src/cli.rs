//! Command-line front end over the command layer.
//!
//! ```bash
//! # Stream 150 synthetic readings from helmet H-01
//! spy-helmet simulate --helmet H-01 --count 150
//!
//! # Store the reference week and print the weekly report
//! spy-helmet seed-kpis --worker W1024
//! spy-helmet report --worker W1024
//! ```

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    sensing::{self, ReadingStatus, SensorPacket, IngestWorker},
    weekly::{self, mock_week},
    AppState,
};

/// SPY helmet fatigue pipeline
#[derive(Parser, Debug)]
#[command(name = "spy-helmet")]
#[command(author, version, about = "Realtime and weekly fatigue analytics for helmet telemetry")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream synthetic sensor packets through the realtime pipeline
    Simulate {
        /// Helmet identifier attached to every packet
        #[arg(long)]
        helmet: String,

        /// Number of packets to send
        #[arg(long, default_value_t = 120)]
        count: usize,

        /// Delay between packets in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },

    /// Print the weekly fatigue report for a worker
    Report {
        #[arg(long)]
        worker: String,

        /// Use the built-in reference week instead of stored KPIs
        #[arg(long)]
        mock: bool,
    },

    /// Store the reference week of daily KPIs for a worker
    SeedKpis {
        #[arg(long)]
        worker: String,

        /// Last day of the seeded week (YYYY-MM-DD), defaults to today
        #[arg(long)]
        last_day: Option<NaiveDate>,
    },

    /// Show whether the models loaded or are running degraded
    Models,
}

pub async fn execute(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Simulate {
            helmet,
            count,
            interval_ms,
        } => simulate(state, helmet, count, Duration::from_millis(interval_ms)).await,
        Commands::Report { worker, mock } => {
            let forecast = if mock {
                let timeout = state.settings.get().inference_timeout();
                state
                    .weekly
                    .run_with_timeout(worker, mock_week(), timeout)
                    .await?
            } else {
                weekly::commands::generate_weekly_report(state, worker)
                    .await
                    .map_err(|e| anyhow!(e))?
            };
            println!("{}", forecast.weekly_report);
            if forecast.degraded {
                println!("\n(forecast model unavailable; fallback value used)");
            }
            Ok(())
        }
        Commands::SeedKpis { worker, last_day } => {
            let last_day = last_day.unwrap_or_else(|| Local::now().date_naive());
            let seeded = weekly::commands::seed_mock_week(state, worker.clone(), last_day)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("Stored {} daily KPI records for {}", seeded.len(), worker);
            Ok(())
        }
        Commands::Models => {
            let report = sensing::commands::model_status(state);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

/// Synthetic packet with the value ranges of a helmet under sustained load.
pub fn synthetic_packet<R: Rng>(rng: &mut R, helmet_id: &str) -> SensorPacket {
    SensorPacket {
        helmet_id: Some(helmet_id.to_string()),
        heart_rate: f64::from(rng.gen_range(150..=155_u32)),
        body_temp: (rng.gen_range(36.0..=37.5_f64) * 10.0).round() / 10.0,
        env_temp: Some(rng.gen_range(30.0..=34.0)),
        pressure: Some(rng.gen_range(1008.0..=1015.0)),
        co_ppm: Some(rng.gen_range(1.2..=1.4)),
        ch4_ppm: Some(rng.gen_range(3.0..=3.3)),
    }
}

async fn simulate(state: &AppState, helmet: String, count: usize, interval: Duration) -> Result<()> {
    let session_id = sensing::commands::start_session(state, helmet.clone())
        .await
        .map_err(|e| anyhow!(e))?;
    println!("Session {session_id} started for helmet {helmet}");

    let (mut worker, mut statuses) = IngestWorker::start(state.sensing.clone(), 32);
    let sender = worker.sender();

    let producer = {
        let helmet = helmet.clone();
        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            for _ in 0..count {
                let packet = synthetic_packet(&mut rng, &helmet);
                if sender.send(packet).await.is_err() {
                    break;
                }
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
            }
        })
    };

    // Rejected or failed readings produce no status, so stop waiting once
    // the stream goes quiet.
    let quiet = interval + state.settings.get().inference_timeout() + Duration::from_secs(1);
    let mut last_label = None;
    for _ in 0..count {
        let Ok(Some(status)) = tokio::time::timeout(quiet, statuses.recv()).await else {
            break;
        };
        match status {
            ReadingStatus::Collecting {
                progress, capacity, ..
            } => {
                if progress % 25 == 0 {
                    println!("collecting {progress}/{capacity}");
                }
            }
            ReadingStatus::Classified(prediction) => {
                let label = prediction.result.label;
                if last_label != Some(label) {
                    println!(
                        "{} {} ({:.1}%)",
                        prediction.timestamp.format("%H:%M:%S"),
                        label.as_str(),
                        prediction.result.confidence
                    );
                    last_label = Some(label);
                }
            }
        }
    }

    drop(statuses);
    worker.stop().await?;
    producer.await?;
    sensing::commands::end_session(state, helmet)
        .await
        .map_err(|e| anyhow!(e))?;

    let metrics = sensing::commands::get_metrics(state)
        .await
        .map_err(|e| anyhow!(e))?;
    println!(
        "readings={} classifications={} degraded={} timeouts={} failures={}",
        metrics.reading_count,
        metrics.classification_count,
        metrics.degraded_count,
        metrics.timeout_count,
        metrics.failure_count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_packets_pass_validation() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let packet = synthetic_packet(&mut rng, "H-01");
            packet.validate().unwrap();
            assert!((150.0..=155.0).contains(&packet.heart_rate));
            assert!((36.0..=37.5).contains(&packet.body_temp));
        }
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["spy-helmet", "simulate", "--helmet", "H1", "--count", "5"]);
        assert!(matches!(
            cli.command,
            Commands::Simulate { ref helmet, count: 5, interval_ms: 0 } if helmet == "H1"
        ));

        let cli = Cli::parse_from(["spy-helmet", "seed-kpis", "--worker", "W1", "--last-day", "2025-03-07"]);
        assert!(matches!(
            cli.command,
            Commands::SeedKpis { last_day: Some(d), .. } if d == NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
        ));
    }
}
