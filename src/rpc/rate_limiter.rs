// src/rpc/rate_limiter.rs

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Fenêtre glissante : au plus `max_requests` départs sur toute fenêtre de
/// `window`, et au moins `min_interval` entre deux départs consécutifs.
///
/// Contrairement à un limiteur qui refuse, `acquire` attend que le budget se libère.
pub struct RateLimiter {
    departures: Mutex<VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, min_interval: Duration) -> Self {
        Self {
            departures: Mutex::new(VecDeque::new()),
            // Un budget nul bloquerait pour toujours.
            max_requests: max_requests.max(1) as usize,
            window,
            min_interval,
        }
    }

    pub fn per_second(max_requests: u32, min_interval: Duration) -> Self {
        Self::new(max_requests, Duration::from_secs(1), min_interval)
    }

    /// Réserve un créneau de départ. Le verrou est tenu pendant l'attente : les
    /// appelants sont servis dans l'ordre et aucun ne peut doubler le budget.
    pub async fn acquire(&self) {
        let mut departures = self.departures.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&front) = departures.front() {
                if now.duration_since(front) >= self.window {
                    departures.pop_front();
                } else {
                    break;
                }
            }

            let mut ready_at = now;
            if departures.len() >= self.max_requests {
                if let Some(&oldest) = departures.front() {
                    ready_at = ready_at.max(oldest + self.window);
                }
            }
            if let Some(&last) = departures.back() {
                ready_at = ready_at.max(last + self.min_interval);
            }

            if ready_at <= now {
                departures.push_back(now);
                return;
            }
            debug!(wait_ms = (ready_at - now).as_millis() as u64, "Budget de débit atteint, attente");
            sleep_until(ready_at).await;
        }
    }
}
