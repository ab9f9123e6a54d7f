//! Downsampling and time filtering over generated histograms

use crate::common::{at, at_millis, msg, two_stream_messages};
use chrono::TimeDelta;
use proptest::prelude::*;
use traffic_history::analysis::{
    build_histogram, downsample, downsample_recomputed, filter_by_time, DownsamplePolicy,
};
use traffic_history::errors::AppError;
use traffic_history::types::{MessageRecord, RateHistogram, RateStatistics};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn assert_stats_close(a: &RateStatistics, b: &RateStatistics) {
    assert_eq!(a.total_messages, b.total_messages);
    assert_eq!(a.total_bytes, b.total_bytes);
    assert_eq!(a.total_seq_messages, b.total_seq_messages);
    assert_eq!(a.start_time, b.start_time);
    assert_eq!(a.end_time, b.end_time);
    assert_eq!(a.total_buckets, b.total_buckets);
    assert_eq!(a.active_buckets, b.active_buckets);
    assert!(close(a.rate.avg, b.rate.avg));
    assert!(close(a.seq_rate.p99, b.seq_rate.p99));
    assert!(close(a.throughput.max, b.throughput.max));
    assert!(close(a.overall_seq_rate, b.overall_seq_rate));
}

fn sample_histogram() -> RateHistogram {
    build_histogram(&two_stream_messages(), TimeDelta::seconds(1)).unwrap()
}

#[test]
fn test_full_span_filter_keeps_statistics() {
    let hist = sample_histogram();
    let filtered = filter_by_time(&hist, hist.start(), hist.end()).unwrap();
    assert_eq!(filtered.len(), hist.len());
    assert_stats_close(&filtered.stats, &hist.stats);

    let open = filter_by_time(&hist, None, None).unwrap();
    assert_stats_close(&open.stats, &hist.stats);
}

#[test]
fn test_filter_recomputes_statistics_for_window() {
    let hist = sample_histogram();
    let filtered = filter_by_time(&hist, Some(at(10)), Some(at(15))).unwrap();

    assert_eq!(filtered.len(), 5);
    assert_eq!(filtered.start(), Some(at(10)));
    let count: u64 = hist.buckets[10..15].iter().map(|b| b.count).sum();
    assert_eq!(filtered.stats.total_messages, count);
    assert_eq!(filtered.stats.total_buckets, 5);
}

#[test]
fn test_filter_keeps_partially_overlapping_buckets() {
    let hist = sample_histogram();
    let filtered = filter_by_time(&hist, Some(at_millis(2_500)), Some(at_millis(4_500))).unwrap();
    assert_eq!(filtered.start(), Some(at(2)));
    assert_eq!(filtered.end(), Some(at(5)));
}

#[test]
fn test_filter_outside_range_is_empty() {
    let hist = sample_histogram();
    let filtered = filter_by_time(&hist, Some(at(500)), Some(at(600))).unwrap();
    assert!(filtered.is_empty());
    assert_eq!(filtered.stats.total_messages, 0);
}

#[test]
fn test_filter_rejects_inverted_window() {
    let hist = sample_histogram();
    assert!(matches!(
        filter_by_time(&hist, Some(at(5)), Some(at(1))),
        Err(AppError::InvalidTimeRange(_))
    ));
}

#[test]
fn test_downsample_rejects_zero_buckets() {
    let hist = sample_histogram();
    assert!(matches!(
        downsample(&hist, 0, DownsamplePolicy::Peak),
        Err(AppError::InvalidArgument(_))
    ));
}

#[test]
fn test_average_policy_divides_by_merged_duration() {
    let messages: Vec<MessageRecord> = (0..8).map(|i| msg("S", i + 1, i as i64, 10)).collect();
    let hist = build_histogram(&messages, TimeDelta::seconds(1)).unwrap();

    let merged = downsample(&hist, 2, DownsamplePolicy::Average).unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged.granularity, TimeDelta::seconds(4));
    assert_eq!(merged.buckets[0].count, 4);
    assert!(close(merged.buckets[0].rate, 1.0));
    assert!(close(merged.buckets[0].throughput, 10.0));
}

#[test]
fn test_recomputed_statistics_follow_merged_buckets() {
    let hist = sample_histogram();
    let kept = downsample(&hist, 3, DownsamplePolicy::Average).unwrap();
    let recomputed = downsample_recomputed(&hist, 3, DownsamplePolicy::Average).unwrap();

    assert_eq!(kept.stats, hist.stats);
    assert_eq!(recomputed.stats.total_buckets, recomputed.len());
    assert_eq!(recomputed.stats.total_messages, hist.stats.total_messages);
}

fn histograms() -> impl Strategy<Value = RateHistogram> {
    prop::collection::vec((1u64..4, 0i64..1_500, 0u64..2_048), 1..150).prop_map(|steps| {
        let mut seq = 0;
        let mut ms = 0;
        let messages: Vec<MessageRecord> = steps
            .into_iter()
            .map(|(seq_step, ms_step, size)| {
                seq += seq_step;
                ms += ms_step;
                MessageRecord::new("S", seq, at_millis(ms), size)
            })
            .collect();
        build_histogram(&messages, TimeDelta::milliseconds(500)).unwrap()
    })
}

proptest! {
    #[test]
    fn prop_within_limit_is_unchanged(hist in histograms(), extra in 0usize..10) {
        let limit = hist.len() + extra;
        let out = downsample(&hist, limit, DownsamplePolicy::Peak).unwrap();
        prop_assert_eq!(out, hist);
    }

    #[test]
    fn prop_downsample_respects_limit_and_totals(
        hist in histograms(),
        limit in 1usize..40,
        average in any::<bool>(),
    ) {
        let policy = if average { DownsamplePolicy::Average } else { DownsamplePolicy::Peak };
        let out = downsample(&hist, limit, policy).unwrap();

        prop_assert!(out.len() <= limit);
        prop_assert_eq!(out.total_count(), hist.total_count());
        prop_assert_eq!(out.total_seq_count(), hist.total_seq_count());
        prop_assert_eq!(out.total_bytes(), hist.total_bytes());
        prop_assert_eq!(out.start(), hist.start());
        prop_assert_eq!(out.end(), hist.end());
    }

    #[test]
    fn prop_peak_merge_reports_run_maximum(hist in histograms(), limit in 1usize..40) {
        let out = downsample(&hist, limit, DownsamplePolicy::Peak).unwrap();
        let factor = if hist.len() <= limit { 1 } else { hist.len().div_ceil(limit) };

        for (merged, run) in out.buckets.iter().zip(hist.buckets.chunks(factor)) {
            let max_rate = run.iter().map(|b| b.rate).fold(0.0, f64::max);
            let max_seq_rate = run.iter().map(|b| b.seq_rate).fold(0.0, f64::max);
            let max_throughput = run.iter().map(|b| b.throughput).fold(0.0, f64::max);
            prop_assert_eq!(merged.rate, max_rate);
            prop_assert_eq!(merged.seq_rate, max_seq_rate);
            prop_assert_eq!(merged.throughput, max_throughput);
        }
    }

    #[test]
    fn prop_full_span_filter_matches_original(hist in histograms()) {
        let filtered = filter_by_time(&hist, hist.start(), hist.end()).unwrap();
        prop_assert_eq!(filtered.len(), hist.len());
        prop_assert_eq!(filtered.stats.total_messages, hist.stats.total_messages);
        prop_assert_eq!(filtered.stats.total_seq_messages, hist.stats.total_seq_messages);
        prop_assert!(close(filtered.stats.rate.avg, hist.stats.rate.avg));
        prop_assert!(close(filtered.stats.seq_rate.p90, hist.stats.seq_rate.p90));
        prop_assert!(close(filtered.stats.msg_size.avg, hist.stats.msg_size.avg));
    }
}
