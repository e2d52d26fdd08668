//! Task status polling
//!
//! One spawned task per watched NodeODM task. It polls `/task/{uuid}/info`
//! on a fixed interval and stops by itself on a terminal status. Dropping
//! the monitor aborts it, so re-selecting a task is just replacing it.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::client::OdmClient;
use super::task::TaskInfo;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Snapshot(TaskInfo),
    /// The info request failed this tick; polling continues
    Unavailable,
}

impl StatusUpdate {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusUpdate::Snapshot(info) if info.status.is_terminal())
    }
}

pub struct StatusMonitor {
    uuid: String,
    handle: JoinHandle<()>,
    updates: mpsc::Receiver<StatusUpdate>,
}

impl StatusMonitor {
    pub fn start(client: OdmClient, uuid: impl Into<String>) -> Self {
        Self::with_interval(client, uuid, POLL_INTERVAL)
    }

    pub fn with_interval(client: OdmClient, uuid: impl Into<String>, period: Duration) -> Self {
        let uuid = uuid.into();
        let (tx, updates) = mpsc::channel(16);
        let task_uuid = uuid.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // First tick completes immediately
                ticker.tick().await;

                let update = match client.get_task_info(&task_uuid).await {
                    Some(info) => StatusUpdate::Snapshot(info),
                    None => StatusUpdate::Unavailable,
                };
                let terminal = update.is_terminal();

                if tx.send(update).await.is_err() {
                    break;
                }
                if terminal {
                    tracing::info!("Task {} reached a terminal state, polling stopped", task_uuid);
                    break;
                }
            }
        });

        tracing::debug!("Started status polling for {}", uuid);
        Self {
            uuid,
            handle,
            updates,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Wait for the next update; None once polling has stopped and all updates are read
    pub async fn next(&mut self) -> Option<StatusUpdate> {
        self.updates.recv().await
    }

    /// Non-blocking variant for the UI tick
    pub fn try_next(&mut self) -> Option<StatusUpdate> {
        self.updates.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(self) {
        tracing::debug!("Stopping status polling for {}", self.uuid);
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odm::testutil::{spawn_stub, StubResponse};
    use crate::odm::TaskStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_polling_stops_on_terminal_status() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let url = spawn_stub(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let code = if n < 2 { 20 } else { 40 };
            StubResponse::json(&format!(
                r#"{{"uuid":"abc","name":"Survey","status":{{"code":{}}},"progress":{}}}"#,
                code,
                n * 50
            ))
        })
        .await;
        let client = OdmClient::new(&url, "").unwrap();
        let mut monitor = StatusMonitor::with_interval(client, "abc", Duration::from_millis(20));

        let mut statuses = Vec::new();
        while let Some(update) = monitor.next().await {
            match update {
                StatusUpdate::Snapshot(info) => statuses.push(info.status),
                StatusUpdate::Unavailable => panic!("stub should always answer"),
            }
        }

        assert_eq!(
            statuses,
            vec![TaskStatus::Running, TaskStatus::Running, TaskStatus::Completed]
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(monitor.is_finished());
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let url = spawn_stub(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                StubResponse::status(500, "busy")
            } else {
                StubResponse::json(r#"{"uuid":"abc","status":{"code":50}}"#)
            }
        })
        .await;
        let client = OdmClient::new(&url, "").unwrap();
        let mut monitor = StatusMonitor::with_interval(client, "abc", Duration::from_millis(20));

        assert_eq!(monitor.next().await, Some(StatusUpdate::Unavailable));
        let last = monitor.next().await.unwrap();
        assert!(last.is_terminal());
        assert_eq!(monitor.next().await, None);
    }

    #[tokio::test]
    async fn test_stop_aborts_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let url = spawn_stub(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            StubResponse::json(r#"{"uuid":"abc","status":{"code":10}}"#)
        })
        .await;
        let client = OdmClient::new(&url, "").unwrap();
        let mut monitor = StatusMonitor::with_interval(client, "abc", Duration::from_millis(20));

        assert!(monitor.next().await.is_some());
        assert_eq!(monitor.uuid(), "abc");
        monitor.stop();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let after_stop = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
    }
}
