//! RecordCache behaviour against a scripted fetcher

mod common;

use std::sync::Arc;

use chrono::TimeDelta;

use common::{t0, ScriptedFetcher};
use wxcache::domain::{detail_report, summary_report};
use wxcache::tree_traits::TreeNodeConvert;
use wxcache::{CacheConfig, CacheError, FetchError, KeyNormalization, RecordCache};

fn cache() -> (Arc<ScriptedFetcher>, RecordCache<Arc<ScriptedFetcher>>) {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let cache = RecordCache::new(Arc::clone(&fetcher), CacheConfig::default());
    (fetcher, cache)
}

// ============================================================
// Miss and hit
// ============================================================

#[test]
fn given_empty_cache_when_get_twice_then_one_fetch_and_same_record() {
    let (fetcher, mut cache) = cache();

    let first = cache.get("Madison", t0()).unwrap();
    let second = cache.get("Madison", t0() + TimeDelta::minutes(30)).unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(first, second);
    assert_eq!(first.city, "Madison");
}

#[test]
fn given_cached_city_when_get_with_other_case_then_hits() {
    let (fetcher, mut cache) = cache();

    cache.get("Madison", t0()).unwrap();
    cache.get("  MADISON ", t0()).unwrap();
    cache.get("madison", t0()).unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        cache.store().cities().map(|k| k.as_str()).collect::<Vec<_>>(),
        vec!["madison"]
    );
}

#[test]
fn given_several_cities_when_cached_then_listed_in_key_order_and_tree_valid() {
    let (fetcher, mut cache) = cache();
    for city in ["Madison", "Austin", "Zürich", "Chicago", "Boston", "Denver"] {
        cache.get(city, t0()).unwrap();
    }

    assert_eq!(fetcher.calls(), 6);
    let keys: Vec<_> = cache.store().cities().map(|k| k.to_string()).collect();
    assert_eq!(keys, ["austin", "boston", "chicago", "denver", "madison", "zürich"]);
    cache.store().tree().check_invariants().unwrap();
}

// ============================================================
// Staleness
// ============================================================

#[test]
fn given_entry_just_under_threshold_when_get_then_no_fetch() {
    let (fetcher, mut cache) = cache();
    cache.get("Madison", t0()).unwrap();

    let record = cache
        .get("Madison", t0() + TimeDelta::hours(1) - TimeDelta::seconds(1))
        .unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(record.temperature, 1.0);
}

#[test]
fn given_entry_exactly_at_threshold_when_get_then_refreshes() {
    let (fetcher, mut cache) = cache();
    cache.get("Madison", t0()).unwrap();

    let record = cache.get("Madison", t0() + TimeDelta::hours(1)).unwrap();

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(record.temperature, 2.0);
}

#[test]
fn given_stale_entry_when_get_then_payload_replaced_in_same_node() {
    let (fetcher, mut cache) = cache();
    for city in ["Madison", "Austin", "Chicago", "Boston", "Denver"] {
        cache.get(city, t0()).unwrap();
    }
    let shape = cache.store().tree().to_tree_string().to_string();
    let id = cache.store().tree().node_id("madison");
    let later = t0() + TimeDelta::hours(2);

    let record = cache.get("Madison", later).unwrap();

    assert_eq!(fetcher.calls(), 6);
    assert_eq!(record.temperature, 6.0);
    assert_eq!(cache.len(), 5);
    assert_eq!(cache.store().tree().node_id("madison"), id);
    assert_eq!(cache.store().tree().to_tree_string().to_string(), shape);
    let entry = cache.lookup("madison").unwrap();
    assert_eq!(entry.last_refreshed(), later);
    assert_eq!(entry.record(), &record);
}

#[test]
fn given_custom_staleness_when_configured_then_threshold_follows_it() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let config = CacheConfig::new().with_staleness(TimeDelta::minutes(5));
    let mut cache = RecordCache::new(Arc::clone(&fetcher), config);

    cache.get("Madison", t0()).unwrap();
    cache.get("Madison", t0() + TimeDelta::minutes(4)).unwrap();
    assert_eq!(fetcher.calls(), 1);
    cache.get("Madison", t0() + TimeDelta::minutes(5)).unwrap();
    assert_eq!(fetcher.calls(), 2);
}

// ============================================================
// Fetch failures
// ============================================================

#[test]
fn given_failing_fetch_on_miss_when_get_then_error_and_key_absent() {
    let (fetcher, mut cache) = cache();
    fetcher.fail("Atlantis");

    let err = cache.get("Atlantis", t0()).unwrap_err();

    assert!(matches!(
        err.as_fetch(),
        Some(FetchError::Timeout { city }) if city == "Atlantis"
    ));
    assert!(cache.lookup("Atlantis").is_none());
    assert!(cache.is_empty());

    // nothing cached, so the next call fetches again
    fetcher.recover("Atlantis");
    cache.get("Atlantis", t0()).unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn given_failing_refresh_when_get_then_error_and_stale_record_kept() {
    let (fetcher, mut cache) = cache();
    let original = cache.get("Madison", t0()).unwrap();
    fetcher.fail("Madison");
    let stale_at = t0() + TimeDelta::minutes(90);

    let err = cache.get("Madison", stale_at).unwrap_err();

    assert!(matches!(err, CacheError::Fetch(FetchError::Timeout { .. })));
    let entry = cache.lookup("Madison").unwrap();
    assert_eq!(entry.record(), &original);
    assert_eq!(entry.last_refreshed(), t0());
    assert_eq!(entry.refresh_failed_at(), Some(stale_at));
}

#[test]
fn given_failed_refresh_when_get_again_within_window_then_serves_stale_without_fetch() {
    let (fetcher, mut cache) = cache();
    let original = cache.get("Madison", t0()).unwrap();
    fetcher.fail("Madison");
    let failed_at = t0() + TimeDelta::minutes(90);
    cache.get("Madison", failed_at).unwrap_err();

    let served = cache
        .get("Madison", failed_at + TimeDelta::minutes(30))
        .unwrap();

    assert_eq!(served, original);
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn given_failed_refresh_when_window_passes_then_retries_and_clears_failure() {
    let (fetcher, mut cache) = cache();
    cache.get("Madison", t0()).unwrap();
    fetcher.fail("Madison");
    let failed_at = t0() + TimeDelta::minutes(90);
    cache.get("Madison", failed_at).unwrap_err();
    fetcher.recover("Madison");

    let retry_at = failed_at + TimeDelta::hours(1);
    let fresh = cache.get("Madison", retry_at).unwrap();

    assert_eq!(fetcher.calls(), 3);
    assert_eq!(fresh.temperature, 3.0);
    let entry = cache.lookup("Madison").unwrap();
    assert_eq!(entry.last_refreshed(), retry_at);
    assert_eq!(entry.refresh_failed_at(), None);
}

// ============================================================
// Keys and bootstrap
// ============================================================

#[test]
fn given_blank_name_when_get_then_invalid_name_without_fetch() {
    let (fetcher, mut cache) = cache();
    assert!(matches!(
        cache.get("\t ", t0()),
        Err(CacheError::InvalidName(_))
    ));
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn given_ascii_normalization_when_non_ascii_case_differs_then_separate_entries() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let config = CacheConfig::new().with_normalization(KeyNormalization::AsciiLowercase);
    let mut cache = RecordCache::new(Arc::clone(&fetcher), config);

    cache.get("Zürich", t0()).unwrap();
    cache.get("ZÜRICH", t0()).unwrap();

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn given_bootstrap_city_when_cache_created_then_first_get_hits() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let mut cache =
        RecordCache::with_bootstrap(Arc::clone(&fetcher), CacheConfig::default(), "Madison", t0());

    cache.get("madison", t0() + TimeDelta::minutes(1)).unwrap();

    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn given_cached_entry_when_formatted_then_reports_mention_city_and_age() {
    let (_fetcher, mut cache) = cache();
    cache.get("Madison", t0()).unwrap();
    let entry = cache.lookup("Madison").unwrap();

    let summary = summary_report(entry, t0() + TimeDelta::minutes(10));
    let detail = detail_report(entry, t0() + TimeDelta::minutes(10));

    assert!(summary.contains("Madison"));
    assert!(detail.contains("Madison"));
    assert!(detail.contains("clear sky"));
}
