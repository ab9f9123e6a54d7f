//! Histogram construction properties
//!
//! Scenario tests pin down the gap interpolation on small inputs; the
//! proptest block checks the conservation rules on generated streams.

use crate::common::{at, at_millis, msg, two_stream_messages};
use chrono::TimeDelta;
use proptest::prelude::*;
use std::collections::BTreeMap;
use traffic_history::analysis::build_histogram;
use traffic_history::errors::AppError;
use traffic_history::types::MessageRecord;

#[test]
fn test_gap_of_three_is_fully_interpolated() {
    let messages = vec![msg("S", 100, 0, 10), msg("S", 101, 1, 10), msg("S", 105, 4, 10)];
    let hist = build_histogram(&messages, TimeDelta::seconds(1)).unwrap();

    assert_eq!(hist.len(), 5);
    assert_eq!(hist.total_count(), 3);
    assert_eq!(hist.total_seq_count() - hist.total_count(), 3);

    // Missing 102..=104 fall between t=1s and t=4s
    let interpolated: u64 = hist.buckets[1..4].iter().map(|b| b.seq_count - b.count).sum();
    assert_eq!(interpolated, 3);
    assert_eq!(hist.buckets[0].deleted_count(), 0);
    assert_eq!(hist.buckets[4].deleted_count(), 0);
}

#[test]
fn test_single_message_gives_single_bucket() {
    let hist = build_histogram(&[msg("S", 1, 7, 64)], TimeDelta::seconds(1)).unwrap();

    assert_eq!(hist.len(), 1);
    let bucket = &hist.buckets[0];
    assert_eq!(bucket.count, 1);
    assert_eq!(bucket.seq_count, 1);
    assert_eq!(bucket.bytes, 64);
    assert_eq!(bucket.start, at(7));
    assert_eq!(bucket.end, at(8));
    assert_eq!(hist.stats.deleted_messages(), 0);
}

#[test]
fn test_empty_input_gives_empty_histogram() {
    let hist = build_histogram(&[], TimeDelta::seconds(1)).unwrap();
    assert!(hist.is_empty());
    assert_eq!(hist.stats.total_messages, 0);
    assert_eq!(hist.start(), None);
}

#[test]
fn test_non_positive_granularity_is_rejected() {
    let messages = vec![msg("S", 1, 0, 1)];
    for granularity in [TimeDelta::zero(), TimeDelta::seconds(-1)] {
        assert!(matches!(
            build_histogram(&messages, granularity),
            Err(AppError::InvalidGranularity(_))
        ));
    }
}

#[test]
fn test_buckets_are_epoch_aligned_and_contiguous() {
    let messages = vec![
        MessageRecord::new("S", 1, at_millis(500), 1),
        MessageRecord::new("S", 2, at_millis(3_200), 1),
    ];
    let hist = build_histogram(&messages, TimeDelta::seconds(1)).unwrap();

    assert_eq!(hist.len(), 4);
    assert_eq!(hist.start(), Some(at(0)));
    assert_eq!(hist.end(), Some(at(4)));
    for pair in hist.buckets.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert_eq!(hist.buckets[1].count, 0);
    assert_eq!(hist.buckets[2].count, 0);
}

#[test]
fn test_gaps_are_interpolated_per_stream() {
    let hist = build_histogram(&two_stream_messages(), TimeDelta::seconds(1)).unwrap();

    let orders_gap: u64 = hist
        .buckets
        .iter()
        .filter_map(|b| b.per_source.get("ORDERS"))
        .map(|c| c.seq_count - c.count)
        .sum();
    let audit_gap: u64 = hist
        .buckets
        .iter()
        .filter_map(|b| b.per_source.get("AUDIT"))
        .map(|c| c.seq_count - c.count)
        .sum();

    assert_eq!(orders_gap, 5);
    assert_eq!(audit_gap, 1);
    assert_eq!(hist.stats.deleted_messages(), 6);
}

#[test]
fn test_unordered_input_matches_sorted_input() {
    let mut messages = two_stream_messages();
    let sorted = build_histogram(&messages, TimeDelta::seconds(2)).unwrap();
    messages.reverse();
    let reversed = build_histogram(&messages, TimeDelta::seconds(2)).unwrap();

    assert_eq!(sorted.len(), reversed.len());
    for (a, b) in sorted.buckets.iter().zip(&reversed.buckets) {
        assert_eq!((a.start, a.count, a.seq_count, a.bytes), (b.start, b.count, b.seq_count, b.bytes));
        assert_eq!(a.per_source, b.per_source);
    }
    assert_eq!(sorted.stats.total_seq_messages, reversed.stats.total_seq_messages);
}

/// Per-stream runs of strictly increasing sequences and non-decreasing timestamps
fn stream_messages() -> impl Strategy<Value = Vec<MessageRecord>> {
    prop::collection::vec((0usize..3, 1u64..6, 0i64..2_500, 0u64..4_096), 1..120).prop_map(
        |steps| {
            let mut cursors: BTreeMap<usize, (u64, i64)> = BTreeMap::new();
            steps
                .into_iter()
                .map(|(stream, seq_step, ms_step, size)| {
                    let cursor = cursors.entry(stream).or_insert((0, 0));
                    cursor.0 += seq_step;
                    cursor.1 += ms_step;
                    MessageRecord::new(format!("S{}", stream), cursor.0, at_millis(cursor.1), size)
                })
                .collect()
        },
    )
}

fn granularity() -> impl Strategy<Value = TimeDelta> {
    prop_oneof![
        Just(TimeDelta::milliseconds(250)),
        Just(TimeDelta::seconds(1)),
        Just(TimeDelta::seconds(5)),
    ]
}

/// Sequences missing between the first and last surviving message of each stream
fn expected_deletions(messages: &[MessageRecord]) -> u64 {
    let mut bounds: BTreeMap<&str, (u64, u64, u64)> = BTreeMap::new();
    for m in messages {
        let entry = bounds
            .entry(m.stream_name.as_str())
            .or_insert((m.sequence, m.sequence, 0));
        entry.0 = entry.0.min(m.sequence);
        entry.1 = entry.1.max(m.sequence);
        entry.2 += 1;
    }
    bounds
        .values()
        .map(|&(first, last, count)| last - first + 1 - count)
        .sum()
}

proptest! {
    #[test]
    fn prop_counts_and_bytes_are_conserved(messages in stream_messages(), g in granularity()) {
        let hist = build_histogram(&messages, g).unwrap();
        let bytes: u64 = messages.iter().map(|m| m.size).sum();

        prop_assert_eq!(hist.total_count(), messages.len() as u64);
        prop_assert_eq!(hist.total_bytes(), bytes);
        prop_assert_eq!(hist.stats.total_messages, messages.len() as u64);
        prop_assert_eq!(hist.stats.total_bytes, bytes);
    }

    #[test]
    fn prop_sequence_rate_never_below_observed_rate(messages in stream_messages(), g in granularity()) {
        let hist = build_histogram(&messages, g).unwrap();
        for bucket in &hist.buckets {
            prop_assert!(bucket.seq_count >= bucket.count);
            prop_assert!(bucket.seq_rate >= bucket.rate);
        }
    }

    #[test]
    fn prop_interpolation_accounts_for_every_gap(messages in stream_messages(), g in granularity()) {
        let hist = build_histogram(&messages, g).unwrap();
        prop_assert_eq!(
            hist.total_seq_count() - hist.total_count(),
            expected_deletions(&messages)
        );
    }

    #[test]
    fn prop_breakdown_sums_to_bucket_totals(messages in stream_messages(), g in granularity()) {
        let hist = build_histogram(&messages, g).unwrap();
        let multi_stream = hist.source_names().len() > 1;
        for bucket in &hist.buckets {
            if !multi_stream {
                prop_assert!(bucket.per_source.is_empty());
                continue;
            }
            let count: u64 = bucket.per_source.values().map(|c| c.count).sum();
            let seq_count: u64 = bucket.per_source.values().map(|c| c.seq_count).sum();
            let bytes: u64 = bucket.per_source.values().map(|c| c.bytes).sum();
            prop_assert_eq!(count, bucket.count);
            prop_assert_eq!(seq_count, bucket.seq_count);
            prop_assert_eq!(bytes, bucket.bytes);
        }
    }
}
