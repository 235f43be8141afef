//! External sources of new workflow payloads.
//!
//! A bound data source is polled once per tick. The fetch runs on a worker
//! thread started when the tick begins and is collected when the tick ends;
//! a fetch that misses its deadline or fails is logged and skipped.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Supplies payloads for new workflow instances.
pub trait WorkflowDataSource<D>: Send + Sync {
    fn fetch(&self) -> anyhow::Result<Vec<D>>;

    /// How long a tick waits for [`fetch`](Self::fetch) to return.
    fn fetch_timeout(&self) -> Duration;
}

/// A fetch in flight on a worker thread.
pub(crate) struct PendingFetch<D> {
    receiver: Receiver<anyhow::Result<Vec<D>>>,
    timeout: Duration,
}

impl<D: Send + 'static> PendingFetch<D> {
    pub(crate) fn spawn(
        source: Arc<dyn WorkflowDataSource<D>>,
        timeout: Duration,
        engine: &str,
    ) -> Option<Self> {
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(format!("{engine}-fetch"))
            .spawn(move || {
                // The receiver is gone if the tick already gave up waiting.
                let _ = sender.send(source.fetch());
            });

        match spawned {
            Ok(_) => Some(Self { receiver, timeout }),
            Err(error) => {
                warn!(engine, %error, "could not start workflow data fetch");
                None
            }
        }
    }

    /// Wait out the deadline; any failure yields no payloads.
    pub(crate) fn collect(self, engine: &str) -> Vec<D> {
        match self.receiver.recv_timeout(self.timeout) {
            Ok(Ok(payloads)) => payloads,
            Ok(Err(error)) => {
                warn!(engine, error = %error, "workflow data fetch failed");
                Vec::new()
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(engine, timeout = ?self.timeout, "took too long to fetch workflow data");
                Vec::new()
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(engine, "workflow data fetch terminated without a result");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct Fixed(Vec<u32>);

    impl WorkflowDataSource<u32> for Fixed {
        fn fetch(&self) -> anyhow::Result<Vec<u32>> {
            Ok(self.0.clone())
        }

        fn fetch_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    struct Broken;

    impl WorkflowDataSource<u32> for Broken {
        fn fetch(&self) -> anyhow::Result<Vec<u32>> {
            bail!("upstream unavailable")
        }

        fn fetch_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    struct Slow;

    impl WorkflowDataSource<u32> for Slow {
        fn fetch(&self) -> anyhow::Result<Vec<u32>> {
            thread::sleep(Duration::from_millis(500));
            Ok(vec![1])
        }

        fn fetch_timeout(&self) -> Duration {
            Duration::from_millis(20)
        }
    }

    fn run(source: Arc<dyn WorkflowDataSource<u32>>) -> Vec<u32> {
        let timeout = source.fetch_timeout();
        PendingFetch::spawn(source, timeout, "test")
            .map(|pending| pending.collect("test"))
            .unwrap_or_default()
    }

    #[test]
    fn successful_fetch_yields_payloads() {
        assert_eq!(run(Arc::new(Fixed(vec![3, 4]))), vec![3, 4]);
    }

    #[test]
    fn failed_fetch_yields_nothing() {
        assert!(run(Arc::new(Broken)).is_empty());
    }

    #[test]
    fn slow_fetch_is_abandoned() {
        assert!(run(Arc::new(Slow)).is_empty());
    }
}
