//! JSON-lines tick replay

use super::{Tick, TickFeed};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Replays ticks from a file with one JSON-encoded [`Tick`] per line
pub struct JsonLinesFeed {
    path: PathBuf,
    buffer_size: usize,
}

impl JsonLinesFeed {
    /// Create a feed over the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer_size: 1024,
        }
    }
}

#[async_trait]
impl TickFeed for JsonLinesFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Tick>> {
        let file = tokio::fs::File::open(&self.path).await?;
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let path = self.path.display().to_string();

        tokio::spawn(async move {
            let mut lines = BufReader::new(file).lines();
            let mut line_no = 0usize;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, %path, "Failed to read tick file");
                        break;
                    }
                };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Tick>(&line) {
                    Ok(tick) => {
                        if tx.send(tick).await.is_err() {
                            tracing::debug!("Tick receiver dropped");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, line = line_no, "Skipping malformed tick");
                    }
                }
            }
        });

        Ok(rx)
    }
}
