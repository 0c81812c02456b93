//! Simulated external review lookup

use crate::books::models::ExternalDetails;
use std::time::Duration;
use tracing::debug;

pub struct ExternalBookService {
    delay: Duration,
}

impl ExternalBookService {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Pretend to call a review API; sleeps for the configured delay
    pub async fn fetch_details(&self, book_id: i64) -> ExternalDetails {
        debug!(book_id, delay_ms = self.delay.as_millis() as u64, "Fetching external details");
        tokio::time::sleep(self.delay).await;

        ExternalDetails {
            book_id,
            review_source: "External API".to_string(),
            rating: 4.5,
            reviews: 120,
        }
    }
}
