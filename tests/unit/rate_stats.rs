//! Percentile and statistics edge cases

use crate::common::{at, msg};
use chrono::TimeDelta;
use traffic_history::analysis::{build_histogram, calculate_stats, percentile, summarize};

#[test]
fn test_percentile_reference_values() {
    assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
    assert_eq!(percentile(&[42.0], 0.5), 42.0);
    assert_eq!(percentile(&[42.0], 0.999), 42.0);
    assert_eq!(percentile(&[], 0.5), 0.0);
}

#[test]
fn test_summarize_uses_population_std_dev() {
    let summary = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    assert_eq!(summary.avg, 5.0);
    assert_eq!(summary.std_dev, 2.0);
    assert_eq!(summary.min, 2.0);
    assert_eq!(summary.max, 9.0);
}

#[test]
fn test_empty_buckets_count_toward_rate_distribution() {
    // Active at t=0 and t=3 only; the two idle seconds pull the mean down
    let messages = vec![msg("S", 1, 0, 100), msg("S", 2, 0, 100), msg("S", 3, 3, 100)];
    let hist = build_histogram(&messages, TimeDelta::seconds(1)).unwrap();
    let stats = &hist.stats;

    assert_eq!(stats.total_buckets, 4);
    assert_eq!(stats.active_buckets, 2);
    assert_eq!(stats.coverage_pct(), 50.0);
    assert_eq!(stats.rate.avg, 0.75);
    assert_eq!(stats.rate.max, 2.0);
    assert_eq!(stats.rate.min, 0.0);
    assert_eq!(stats.start_time, Some(at(0)));
    assert_eq!(stats.end_time, Some(at(4)));
    assert_eq!(stats.total_duration, TimeDelta::seconds(4));
    assert_eq!(stats.overall_seq_rate, 0.75);
    assert_eq!((stats.first_seq, stats.last_seq), (1, 3));
}

#[test]
fn test_message_size_statistics_use_individual_sizes() {
    let messages = vec![msg("S", 1, 0, 10), msg("S", 2, 0, 30), msg("S", 3, 1, 200)];
    let hist = build_histogram(&messages, TimeDelta::seconds(1)).unwrap();

    assert_eq!(hist.stats.msg_size.min, 10.0);
    assert_eq!(hist.stats.msg_size.max, 200.0);
    assert_eq!(hist.stats.msg_size.p50, 30.0);
}

#[test]
fn test_stats_of_empty_slice_are_zero() {
    let stats = calculate_stats(&[]);
    assert_eq!(stats.total_messages, 0);
    assert_eq!(stats.start_time, None);
    assert_eq!(stats.rate.avg, 0.0);
}
