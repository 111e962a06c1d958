use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use market::types::Direction;
use variant::catalog::VariantCatalog;
use variant::selector::{Selection, VariantSelector, VariantStrategy};
use variant::types::{RandomnessProvider, RequestId, RequestRecord, VariantError, VariantRef};

/// Provider that records every request and never delivers on its own.
#[derive(Default)]
struct RecordingProvider {
    requests: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl RandomnessProvider for RecordingProvider {
    async fn request(&self, consumer_id: &str) -> Result<RequestId, VariantError> {
        if self.fail {
            return Err(VariantError::Randomness("coordinator down".into()));
        }

        let mut requests = self.requests.lock().await;
        requests.push(consumer_id.to_string());
        Ok(RequestId(100 + requests.len() as u64))
    }
}

fn randomized(provider: Arc<RecordingProvider>) -> VariantSelector {
    VariantSelector::new(
        VariantCatalog::default(),
        VariantStrategy::Randomized(provider),
        "bull-bear",
    )
    .unwrap()
}

#[tokio::test]
async fn flip_issues_exactly_one_request() {
    let provider = Arc::new(RecordingProvider::default());
    let selector = randomized(provider.clone());

    let out = selector.select(Direction::Bear).await.unwrap();

    assert_eq!(
        out,
        Selection::Deferred(RequestRecord {
            request_id: RequestId(101),
            requested: Direction::Bear,
        })
    );
    assert_eq!(*provider.requests.lock().await, vec!["bull-bear".to_string()]);
    assert!(selector.is_randomized());
}

#[tokio::test]
async fn provider_failure_is_surfaced() {
    let provider = Arc::new(RecordingProvider {
        fail: true,
        ..Default::default()
    });
    let selector = randomized(provider);

    let out = selector.select(Direction::Bull).await;
    assert!(matches!(out, Err(VariantError::Randomness(_))));
}

#[tokio::test]
async fn resolved_variant_points_into_bear_assets() {
    let selector = randomized(Arc::new(RecordingProvider::default()));

    let Selection::Deferred(record) = selector.select(Direction::Bear).await.unwrap() else {
        panic!("randomized strategy must defer");
    };

    let v = selector.resolve(&record, 1_000_000_000_004);
    assert_eq!(v, VariantRef::new(Direction::Bear, (1_000_000_000_004u64 % 3) as usize));
    assert!(selector.uri(&v).unwrap().contains("_bear.json"));
}
