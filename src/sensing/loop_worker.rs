use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::controller::{ReadingStatus, SensingController};
use super::packet::SensorPacket;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Feeds packets into the controller until the channel closes or the token
/// is cancelled. Status updates go to `status_tx`; a dropped receiver does not
/// stop ingestion.
pub async fn ingest_loop(
    controller: SensingController,
    mut packets: mpsc::Receiver<SensorPacket>,
    cancel_token: CancellationToken,
    status_tx: mpsc::Sender<ReadingStatus>,
) {
    let mut processed: u64 = 0;
    let mut listener_gone = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("ingest loop shutting down after {} packets", processed);
                break;
            }
            next = packets.recv() => {
                let Some(packet) = next else {
                    log_info!("packet channel closed after {} packets", processed);
                    break;
                };
                processed += 1;

                let helmet = packet.helmet_id.clone();
                match controller.submit_reading(packet).await {
                    Ok(status) => {
                        if !listener_gone && status_tx.send(status).await.is_err() {
                            log_warn!("status listener dropped; continuing without updates");
                            listener_gone = true;
                        }
                    }
                    Err(err) => log_warn!(
                        "reading from helmet {} dropped: {}",
                        helmet.as_deref().unwrap_or("<none>"),
                        err
                    ),
                }
            }
        }
    }
}
