use crate::executor::{FlowEvent, FlowObserver};

use super::writer::EventsOutTx;

/// Observer that writes each event as one JSON line to the events_out
/// channel, stamped with a run id and a timestamp.
pub struct JsonlEventSink {
    tx: EventsOutTx,
    run_id: String,
}

impl JsonlEventSink {
    pub fn new(tx: EventsOutTx) -> Self {
        Self {
            tx,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn line(&self, event: &FlowEvent) -> Option<String> {
        let mut value = serde_json::to_value(event).ok()?;
        let obj = value.as_object_mut()?;
        obj.insert("run_id".into(), self.run_id.clone().into());
        obj.insert("ts".into(), chrono::Utc::now().to_rfc3339().into());
        serde_json::to_string(&value).ok()
    }
}

impl FlowObserver for JsonlEventSink {
    fn on_event(&mut self, event: &FlowEvent) {
        if let Some(line) = self.line(event) {
            self.tx.send_line_blocking(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventsOutConfig;
    use crate::events_out::start_events_out;
    use crate::task::{TaskId, TaskStatus};

    #[tokio::test]
    async fn events_become_tagged_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.events.jsonl");
        let cfg = EventsOutConfig {
            enabled: true,
            path: path.to_string_lossy().to_string(),
            channel_capacity: 16,
            drop_when_full: true,
        };
        let (tx, handle) = start_events_out(&cfg).await.unwrap().unwrap();

        let mut sink = JsonlEventSink::new(tx);
        let run_id = sink.run_id().to_string();
        sink.on_event(&FlowEvent::Started);
        sink.on_event(&FlowEvent::TaskStatusChanged {
            id: TaskId(3),
            status: TaskStatus::InProgress,
        });
        drop(sink);
        handle.await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "started");
        assert_eq!(lines[1]["status"], "in_progress");
        assert_eq!(lines[1]["run_id"], run_id.as_str());
        assert!(lines[1]["ts"].is_string());
    }
}
