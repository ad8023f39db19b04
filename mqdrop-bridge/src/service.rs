//! Bridge service: wires configuration into a [`Poller`] that delivers over
//! TCP.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::info;

use mqdrop_core::{CycleOutcome, DeliveryClient, DeliveryHandler, PollStats, Poller, TcpTransport};

use crate::config::BridgeConfig;

// ── BridgeService ────────────────────────────────────────────────

/// The top-level bridge service.
pub struct BridgeService {
    poller: Poller<DeliveryHandler<TcpTransport>>,
}

impl BridgeService {
    /// Build the service from a validated configuration.
    pub fn new(config: &BridgeConfig) -> Self {
        let transport = TcpTransport::new(config.connect_timeout(), config.reply_timeout());
        let client = DeliveryClient::new(transport, config.delivery_settings());
        let handler =
            DeliveryHandler::new(config.header.clone(), config.message_settings(), client);

        info!(
            directory = %config.watch.directory.display(),
            endpoint = %config.endpoint(),
            queue = %config.queue.queue,
            "bridge configured"
        );

        Self {
            poller: Poller::new(config.poller_config(), handler),
        }
    }

    /// Obtain a handle that stops the service from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.poller.stop_handle()
    }

    /// Poll until stopped.
    pub async fn run(&mut self) {
        self.poller.run().await;
    }

    /// Run a single cycle.
    pub async fn run_once(&mut self) -> CycleOutcome {
        self.poller.poll_once().await
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.poller.stop();
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.poller.is_running()
    }

    pub fn stats(&self) -> PollStats {
        self.poller.stats()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;

    fn config_for(directory: &std::path::Path, port: u16) -> BridgeConfig {
        let mut config = BridgeConfig::template();
        config.watch.directory = directory.to_path_buf();
        config.watch.min_file_age_ms = 0;
        config.queue.host = "127.0.0.1".into();
        config.queue.port = port;
        config.queue.connect_timeout_ms = 500;
        config
    }

    #[test]
    fn stop_handle_works() {
        let dir = tempfile::tempdir().unwrap();
        let svc = BridgeService::new(&config_for(dir.path(), 1414));
        assert!(svc.is_running());
        svc.stop_handle().store(false, Ordering::SeqCst);
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn once_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = BridgeService::new(&config_for(&dir.path().join("absent"), 1414));
        assert_eq!(svc.run_once().await, CycleOutcome::DirectoryMissing);
        assert_eq!(svc.stats().cycles, 1);
    }

    #[tokio::test]
    async fn unreachable_queue_manager_fails_cycle() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml"), b"<a/>").unwrap();
        let mut svc = BridgeService::new(&config_for(dir.path(), port));

        let outcome = tokio::time::timeout(Duration::from_secs(5), svc.run_once())
            .await
            .unwrap();
        assert!(outcome.is_failure());
        assert_eq!(svc.stats().failed, 1);
        assert!(dir.path().join("a.xml").exists());
    }
}
