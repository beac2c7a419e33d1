//! End-to-end sampling against the in-memory archive.

mod support;

use std::sync::Arc;

use chrono::Duration;
use vso_sampler::archive::{
    ArchiveError, ArchiveSearch, LocalArchive, RetryPolicy, RetryingSearch,
};
use vso_sampler::models::{Instrument, TimeInterval, UrlKinds};
use vso_sampler::services::{sample_by_cadence, CappedSampler, NSO_CAP_QUERY_SIZE};
use vso_sampler::SamplerError;

#[tokio::test]
async fn test_reference_month_below_cap() {
    let archive = support::minute_archive(NSO_CAP_QUERY_SIZE);

    let batch = sample_by_cadence(
        &archive,
        "2012-01-01 00:00:01",
        "2012-02-01 23:59:59",
        100,
        "mauna loa",
        true,
    )
    .await
    .unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(archive.query_count(), 1);
    // one record every 100 minutes, both ends inclusive
    assert_eq!(batch.n_queried_files(), 461);
}

#[tokio::test]
async fn test_split_covers_the_whole_range() {
    let archive = support::minute_archive(100);
    let month = support::reference_month();

    let batch = CappedSampler::new(&archive)
        .with_cap(100)
        .sample(month, 100, "ML")
        .await
        .unwrap();

    assert!(batch.is_split());
    assert_eq!(batch.len(), 460 / 100);

    let queries = archive.queries();
    assert_eq!(queries.len(), 1 + batch.len());
    assert_eq!(queries[0].interval, month);

    let subs: Vec<TimeInterval> = queries[1..].iter().map(|q| q.interval).collect();
    assert_eq!(subs.first().unwrap().start(), month.start());
    assert_eq!(subs.last().unwrap().end(), month.end());
    for pair in subs.windows(2) {
        assert_eq!(pair[0].end(), pair[1].start());
    }

    let returned: Vec<TimeInterval> = batch.iter().map(|r| r.interval()).collect();
    assert_eq!(returned, subs);
}

#[tokio::test]
async fn test_split_results_carry_urls() {
    let archive = support::minute_archive(100);

    let batch = CappedSampler::new(&archive)
        .with_cap(100)
        .sample(support::reference_month(), 100, "mauna loa")
        .await
        .unwrap();

    let metadata = batch.generate_url_metadata(UrlKinds::all());
    assert_eq!(metadata.jpg_urls.len(), batch.n_queried_files());
    assert_eq!(metadata.fits_urls.len(), batch.n_queried_files());
    assert!(metadata.jpg_urls.iter().all(|u| u.ends_with(".jpg")));
}

#[tokio::test]
async fn test_other_sites_are_filtered_out() {
    let archive = LocalArchive::new();
    let day = TimeInterval::parse("2012-01-01", "2012-01-02").unwrap();
    archive.generate_regular(Instrument::BigBear, day, Duration::minutes(5));
    archive.generate_regular(Instrument::Learmonth, day, Duration::minutes(5));

    let batch = sample_by_cadence(&archive, "2012-01-01", "2012-01-02", 60, "big bear", false)
        .await
        .unwrap();

    assert_eq!(batch.n_queried_files(), 25);
    assert!(batch.records().all(|r| r.source.as_deref() == Some("BB")));
}

#[tokio::test]
async fn test_works_through_trait_object() {
    let archive: Arc<dyn ArchiveSearch> = Arc::new(support::minute_archive(NSO_CAP_QUERY_SIZE));

    let batch = sample_by_cadence(
        archive.as_ref(),
        "2012-01-10",
        "2012-01-11",
        30,
        "gong",
        false,
    )
    .await
    .unwrap();

    assert_eq!(batch.n_queried_files(), 48);
}

#[tokio::test]
async fn test_upstream_failure_propagates() {
    let archive = support::minute_archive(100);
    archive.fail_after(0);

    let err = sample_by_cadence(
        &archive,
        "2012-01-01 00:00:01",
        "2012-02-01 23:59:59",
        100,
        "ML",
        false,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        SamplerError::UpstreamQuery(ArchiveError::QueryError { .. })
    ));
}

#[tokio::test]
async fn test_retry_layer_hides_transient_failures() {
    let archive = support::minute_archive(100);
    archive.fail_transiently(2);
    let search = RetryingSearch::new(
        archive.clone(),
        RetryPolicy::new(3, std::time::Duration::ZERO),
    );

    let batch = CappedSampler::new(&search)
        .with_cap(100)
        .sample(support::reference_month(), 100, "ML")
        .await
        .unwrap();

    assert_eq!(batch.len(), 4);
    assert_eq!(archive.query_count(), 2 + 1 + 4);
}

#[tokio::test]
async fn test_without_retries_transient_failure_is_fatal() {
    let archive = support::minute_archive(100);
    archive.fail_transiently(1);

    let err = CappedSampler::new(&archive)
        .with_cap(100)
        .sample(support::reference_month(), 100, "ML")
        .await
        .unwrap_err();

    match err {
        SamplerError::UpstreamQuery(inner) => assert!(inner.is_retryable()),
        other => panic!("unexpected error: {other:?}"),
    }
}
