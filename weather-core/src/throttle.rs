use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Keeps successive outbound requests at least `min_interval` apart.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_request: None }
    }

    /// Suspends until the interval since the previous request has passed, then
    /// records now as the start of the next one.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                log::debug!("Rate limiting: sleeping for {:.2} seconds", wait.as_secs_f64());
                sleep(wait).await;
            }
        }

        self.last_request = Some(Instant::now());
    }

    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }
}
