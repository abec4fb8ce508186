//! Per-host request limiting
//!
//! Each host gets its own semaphore bounding concurrent requests, and every
//! request waits a random delay before it is sent.

use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::url::host_with_port;

/// Bounds parallelism per host and spaces requests with a random delay
#[derive(Debug)]
pub struct HostLimiter {
    parallelism: usize,
    random_delay: Duration,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    /// Creates a limiter allowing `parallelism` concurrent requests per host
    pub fn new(parallelism: u32, random_delay: Duration) -> Self {
        Self {
            parallelism: parallelism.max(1) as usize,
            random_delay,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore_for(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.parallelism)))
            .clone()
    }

    /// Waits for a slot on the URL's host, then for the random delay
    ///
    /// The returned permit must be held for the duration of the request.
    pub async fn acquire(&self, url: &Url) -> Option<OwnedSemaphorePermit> {
        let host = host_with_port(url).unwrap_or_default();
        let permit = self.semaphore_for(&host).acquire_owned().await.ok()?;

        let delay = self.jitter();
        if !delay.is_zero() {
            tracing::trace!("Delaying request to {} by {:?}", url, delay);
            tokio::time::sleep(delay).await;
        }

        Some(permit)
    }

    /// Picks a delay in `[0, random_delay)`
    pub fn jitter(&self) -> Duration {
        let max_ms = self.random_delay.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..max_ms))
    }

    /// Number of free request slots for a host
    pub fn available(&self, url: &Url) -> usize {
        let host = host_with_port(url).unwrap_or_default();
        self.semaphore_for(&host).available_permits()
    }
}
