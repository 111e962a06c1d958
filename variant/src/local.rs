//! In-process randomness provider.
//!
//! Stands in for an external VRF service: every request gets a fresh id and a
//! seeded random word, delivered later over a channel so the round trip stays
//! asynchronous.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, mpsc::Sender};

use crate::types::{Fulfillment, RandomnessProvider, RequestId, VariantError};

pub struct LocalRandomness {
    rng: Mutex<StdRng>,
    next_id: Mutex<u64>,
    delay: Duration,
    deliveries: Sender<Fulfillment>,
}

impl LocalRandomness {
    pub fn new(seed: u64, delay: Duration, deliveries: Sender<Fulfillment>) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            next_id: Mutex::new(1),
            delay,
            deliveries,
        }
    }
}

impl LocalRandomness {
    /// Deliver a fresh value for a request issued before this provider existed,
    /// such as one restored after a restart. Later ids continue after it.
    pub async fn redeliver(&self, request_id: RequestId, consumer_id: &str) {
        {
            let mut next = self.next_id.lock().await;
            *next = (*next).max(request_id.0 + 1);
        }
        let random_value: u64 = self.rng.lock().await.r#gen();

        tracing::info!(request_id = %request_id, "redelivering restored request");
        self.deliver_later(request_id, random_value, consumer_id);
    }

    fn deliver_later(&self, request_id: RequestId, random_value: u64, consumer_id: &str) {
        let tx = self.deliveries.clone();
        let delay = self.delay;
        let consumer = consumer_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let fulfillment = Fulfillment {
                request_id,
                random_value,
            };
            if let Err(e) = tx.send(fulfillment).await {
                tracing::warn!(
                    request_id = %request_id,
                    consumer = %consumer,
                    error = %e,
                    "randomness delivery dropped"
                );
            }
        });
    }
}

#[async_trait]
impl RandomnessProvider for LocalRandomness {
    async fn request(&self, consumer_id: &str) -> Result<RequestId, VariantError> {
        if self.deliveries.is_closed() {
            return Err(VariantError::Randomness("delivery channel closed".into()));
        }

        let request_id = {
            let mut next = self.next_id.lock().await;
            let id = RequestId(*next);
            *next += 1;
            id
        };
        let random_value: u64 = self.rng.lock().await.r#gen();

        self.deliver_later(request_id, random_value, consumer_id);

        Ok(request_id)
    }
}
