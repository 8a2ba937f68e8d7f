use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ── Replay stream ─────────────────────────────────────────────────────────────

/// Message from a replay task to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEvent {
    Chunk { generation: u64, text: String },
    Done { generation: u64 },
}

pub struct ReplayRequest {
    pub generation: u64,
    pub transcript: String,
    pub chunk_chars: usize,
    pub interval: Duration,
    pub tx: mpsc::UnboundedSender<ReplayEvent>,
    pub cancel: CancellationToken,
}

/// Split `text` into pieces of at most `chunk_chars` characters, never
/// cutting a UTF-8 sequence.
pub fn chunk_transcript(text: &str, chunk_chars: usize) -> Vec<String> {
    let size = chunk_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Feed the transcript back as a stream, one chunk per interval.
/// Stops quietly when cancelled or when the receiver is gone.
pub async fn replay(req: ReplayRequest) -> Result<()> {
    let ReplayRequest { generation, transcript, chunk_chars, interval, tx, cancel } = req;
    let chunks = chunk_transcript(&transcript, chunk_chars);
    tracing::debug!(generation, chunks = chunks.len(), "replay started");

    for text in chunks {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(generation, "replay cancelled");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
        if tx.send(ReplayEvent::Chunk { generation, text }).is_err() {
            return Ok(());
        }
    }
    let _ = tx.send(ReplayEvent::Done { generation });
    Ok(())
}
