//! End-to-end walkthroughs with the 60 second interval used by the reference deployment.

use tokio::test;

use market::types::{Direction, Trend};
use upkeep::types::{UpkeepError, UpkeepOutcome};
use variant::types::{RequestId, VariantRef};

mod mock_collaborators;
use mock_collaborators::{BASELINE, Harness, T0};

const SEC: u64 = 1_000;

#[test]
async fn unchanged_price_only_advances_time() -> anyhow::Result<()> {
    let h = Harness::deterministic().await?;
    h.mint(2).await?;

    assert!(!h.engine.check_evaluation(T0 + 10 * SEC).await);
    assert!(h.engine.check_evaluation(T0 + 61 * SEC).await);

    let out = h.engine.perform_upkeep(T0 + 61 * SEC).await?;
    assert!(matches!(out, UpkeepOutcome::Unchanged { .. }));

    assert_eq!(h.engine.stored_price().await, BASELINE);
    assert_eq!(h.engine.last_evaluation_ms().await, T0 + 61 * SEC);
    assert_eq!(h.engine.current_trend().await, Trend::Neutral);
    assert!(h.engine.token_uri(0).await?.contains("filename=gamer_bull.json"));

    Ok(())
}

#[test]
async fn rise_from_baseline_applies_the_bull_asset() -> anyhow::Result<()> {
    let h = Harness::deterministic().await?;
    h.mint(2).await?;

    h.feed.set_price(BASELINE + 3_000_010_000).await;
    let out = h.engine.perform_upkeep(T0 + 61 * SEC).await?;

    assert!(matches!(out, UpkeepOutcome::Applied(a) if a.trend() == Trend::Bull));
    assert_eq!(h.engine.pending_request().await, None);
    assert!(
        h.variants()
            .await
            .iter()
            .all(|v| *v == VariantRef::new(Direction::Bull, 0))
    );

    Ok(())
}

#[test]
async fn rising_price_selects_the_bull_asset_once() -> anyhow::Result<()> {
    let h = Harness::deterministic().await?;
    h.mint(3).await?;

    // First push the collection into bear territory.
    h.feed.set_price(BASELINE - 3_000_010_000).await;
    h.engine.perform_upkeep(T0 + 61 * SEC).await?;
    assert_eq!(h.engine.current_trend().await, Trend::Bear);

    h.feed.set_price(BASELINE + 3_000_010_000).await;
    let out = h.engine.perform_upkeep(T0 + 122 * SEC).await?;
    assert!(matches!(out, UpkeepOutcome::Applied(a) if a.items == 3));
    for id in 0..3 {
        assert!(h.engine.token_uri(id).await?.contains("filename=gamer_bull.json"));
    }

    h.feed.set_price(BASELINE + 6_000_000_000).await;
    let out = h.engine.perform_upkeep(T0 + 183 * SEC).await?;
    assert!(matches!(out, UpkeepOutcome::Unchanged { .. }));
    assert_eq!(h.engine.current_trend().await, Trend::Bull);
    assert!(
        h.variants()
            .await
            .iter()
            .all(|v| *v == VariantRef::new(Direction::Bull, 0))
    );

    Ok(())
}

#[test]
async fn falling_price_resolves_into_a_random_bear() -> anyhow::Result<()> {
    let h = Harness::randomized().await?;
    h.mint(5).await?;

    h.feed.set_price(BASELINE - 1_000).await;
    let UpkeepOutcome::RequestIssued(record) = h.engine.perform_upkeep(T0 + 61 * SEC).await?
    else {
        panic!("expected a randomness request");
    };

    let unrelated = RequestId(record.request_id.0 + 1);
    let err = h.engine.on_randomness_fulfilled(unrelated, 7).await.unwrap_err();
    assert!(matches!(err, UpkeepError::MismatchedFulfillment { .. }));
    assert_eq!(h.engine.current_trend().await, Trend::Neutral);

    let v: u64 = 77_777_777_777;
    h.engine.on_randomness_fulfilled(record.request_id, v).await?;

    let expected = VariantRef::new(Direction::Bear, (v % 3) as usize);
    assert_eq!(h.engine.current_variant_index().await, expected.index);
    assert!(h.variants().await.iter().all(|x| *x == expected));

    Ok(())
}
