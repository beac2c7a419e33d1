//! Property tests for interval validation, partitioning and the split estimate.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use vso_sampler::archive::LocalArchive;
use vso_sampler::models::{partition_time_interval, validate_time_interval, Timestamp};
use vso_sampler::services::CappedSampler;
use vso_sampler::SamplerError;

// 1990-01-01 .. 2040-01-01
const EPOCH_RANGE: std::ops::Range<i64> = 631_152_000..2_208_988_800;

fn timestamp(secs: i64) -> Timestamp {
    Utc.timestamp_opt(secs, 0).single().expect("in range")
}

proptest! {
    #[test]
    fn ordered_pairs_validate(start in EPOCH_RANGE, width in 1i64..10_000_000) {
        let (a, b) = (timestamp(start), timestamp(start + width));
        let interval = validate_time_interval(a, b).unwrap();

        prop_assert_eq!(interval.start(), a);
        prop_assert_eq!(interval.end(), b);
        prop_assert!(interval.start() < interval.end());
    }

    #[test]
    fn unordered_pairs_are_rejected(start in EPOCH_RANGE, back in 0i64..10_000_000) {
        let (a, b) = (timestamp(start), timestamp(start - back));
        let err = validate_time_interval(a, b).unwrap_err();
        prop_assert!(matches!(err, SamplerError::InvalidInterval(_)));
    }

    #[test]
    fn string_and_timestamp_inputs_agree(start in EPOCH_RANGE, width in 1i64..1_000_000) {
        let (a, b) = (timestamp(start), timestamp(start + width));
        let fmt = "%Y-%m-%d %H:%M:%S";
        let from_strings = validate_time_interval(
            a.format(fmt).to_string(),
            b.format(fmt).to_string(),
        )
        .unwrap();

        prop_assert_eq!(from_strings, validate_time_interval(a, b).unwrap());
    }

    #[test]
    fn partition_reconstructs_interval(
        start in EPOCH_RANGE,
        width in 1i64..100_000_000,
        n in 1usize..500,
    ) {
        let (a, b) = (timestamp(start), timestamp(start + width));
        let points = partition_time_interval(a, b, n).unwrap();

        prop_assert_eq!(points.len(), n + 1);
        prop_assert_eq!(points[0], a);
        prop_assert_eq!(points[n], b);
        for pair in points.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }

        // widths differ by at most one nanosecond
        let widths: Vec<Duration> = points.windows(2).map(|p| p[1] - p[0]).collect();
        let min = widths.iter().min().unwrap();
        let max = widths.iter().max().unwrap();
        prop_assert!(*max - *min <= Duration::nanoseconds(1));
    }

    #[test]
    fn split_estimate_matches_formula(
        minutes in 1i64..2_000_000,
        cadence in 1u32..1_000,
        cap in 1usize..20_000,
    ) {
        let start = timestamp(EPOCH_RANGE.start);
        let interval = validate_time_interval(start, start + Duration::minutes(minutes)).unwrap();
        let archive = LocalArchive::new();
        let sampler = CappedSampler::new(&archive).with_cap(cap);

        let expected = (minutes as u64 / u64::from(cadence)) / cap as u64;
        prop_assert_eq!(sampler.estimate_intervals(&interval, cadence) as u64, expected);
    }
}

#[test]
fn partition_rejects_zero() {
    let a = timestamp(EPOCH_RANGE.start);
    let err = partition_time_interval(a, a + Duration::hours(1), 0).unwrap_err();
    assert!(matches!(err, SamplerError::InvalidInterval(_)));
}

#[test]
fn partition_rejects_more_parts_than_nanoseconds() {
    let a = timestamp(EPOCH_RANGE.start);
    assert!(partition_time_interval(a, a + Duration::nanoseconds(3), 4).is_err());
    assert_eq!(
        partition_time_interval(a, a + Duration::nanoseconds(3), 3)
            .unwrap()
            .len(),
        4
    );
}
