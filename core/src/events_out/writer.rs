use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::config::EventsOutConfig;

fn audit_preview(s: &str) -> String {
    const MAX: usize = 120;
    if s.len() <= MAX {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .take_while(|(i, _)| *i < MAX)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let mut out = s[..end].to_string();
    out.push('…');
    out
}

#[derive(Clone)]
pub struct EventsOutTx {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
    drop_when_full: bool,
}

impl EventsOutTx {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn send_line(&self, line: String) {
        if self.drop_when_full {
            if self.tx.try_send(line).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        } else if self.tx.send(line).await.is_err() {
            // writer closed
        }
    }

    /// Sends from synchronous code. Must not be called on a runtime worker
    /// thread unless `drop_when_full` is set.
    pub fn send_line_blocking(&self, line: String) {
        if self.drop_when_full {
            if self.tx.try_send(line).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        } else if self.tx.blocking_send(line).is_err() {
            // writer closed
        }
    }
}

/// Spawns the writer task. Returns the sender and the task handle; the task
/// ends, flushing, once every sender is dropped.
pub async fn start_events_out(
    cfg: &EventsOutConfig,
) -> Result<Option<(EventsOutTx, tokio::task::JoinHandle<()>)>, String> {
    if !cfg.enabled || cfg.path.trim().is_empty() {
        return Ok(None);
    }

    let path = cfg.path.clone();
    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = if path == "stdout:" {
        Box::new(tokio::io::stdout())
    } else {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("cannot open events_out {path}: {e}"))?;
        Box::new(file)
    };

    let (tx, mut rx) = mpsc::channel::<String>(cfg.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));

    let handle = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            if path == "stdout:" {
                tracing::debug!(
                    target: "fabflow.stdout_audit",
                    kind = "events_out",
                    bytes = line.len(),
                    preview = %audit_preview(line.trim_end())
                );
            }
            if writer.write_all(line.as_bytes()).await.is_err() {
                return;
            }
        }

        let _ = writer.flush().await;
    });

    Ok(Some((
        EventsOutTx {
            tx,
            dropped,
            drop_when_full: cfg.drop_when_full,
        },
        handle,
    )))
}
