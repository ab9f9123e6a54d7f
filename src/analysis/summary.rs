//! Cross-stream report summary

use crate::types::{MessageRecord, ReportSummary, ReportedBounds, StreamInfo, StreamSummary};
use crate::utils::math::per_second;
use crate::utils::time::delta_seconds;
use std::collections::BTreeMap;

/// Roll the analysed messages up into per-stream and combined totals.
///
/// Sequence rates count sequence advances (`last - first`) over the combined
/// time span. `stream_count` is the number of streams discovered, which may
/// exceed the number that contributed messages.
pub fn build_summary(messages: &[MessageRecord], stream_count: usize) -> ReportSummary {
    let (start, end) = match (
        messages.iter().map(|m| m.timestamp).min(),
        messages.iter().map(|m| m.timestamp).max(),
    ) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return ReportSummary {
                stream_count,
                ..Default::default()
            }
        }
    };
    let duration = end - start;
    let seconds = delta_seconds(duration);

    let mut per_stream: BTreeMap<&str, StreamSummary> = BTreeMap::new();
    for msg in messages {
        let summary = per_stream
            .entry(msg.stream_name.as_str())
            .or_insert_with(|| StreamSummary {
                name: msg.stream_name.clone(),
                messages: 0,
                bytes: 0,
                first_seq: msg.sequence,
                last_seq: msg.sequence,
                sequence_span: 0,
                start_time: Some(msg.timestamp),
                end_time: Some(msg.timestamp),
                msg_rate: 0.0,
                seq_rate: 0.0,
                reported: None,
            });
        summary.messages += 1;
        summary.bytes += msg.size;
        summary.first_seq = summary.first_seq.min(msg.sequence);
        summary.last_seq = summary.last_seq.max(msg.sequence);
        summary.start_time = summary.start_time.min(Some(msg.timestamp));
        summary.end_time = summary.end_time.max(Some(msg.timestamp));
    }

    let mut total_seqs = 0;
    let mut streams: Vec<StreamSummary> = per_stream
        .into_values()
        .map(|mut s| {
            let advanced = s.last_seq - s.first_seq;
            s.sequence_span = advanced + 1;
            s.msg_rate = per_second(s.messages, seconds);
            s.seq_rate = per_second(advanced, seconds);
            total_seqs += advanced;
            s
        })
        .collect();
    streams.sort_by(|a, b| b.messages.cmp(&a.messages).then_with(|| a.name.cmp(&b.name)));

    let total_messages = messages.len() as u64;
    let total_bytes: u64 = messages.iter().map(|m| m.size).sum();

    ReportSummary {
        start_time: Some(start),
        end_time: Some(end),
        duration,
        stream_count,
        total_messages,
        total_bytes,
        total_seqs,
        msg_rate: per_second(total_messages, seconds),
        seq_rate: per_second(total_seqs, seconds),
        throughput: per_second(total_bytes, seconds),
        streams,
    }
}

/// [`build_summary`] enriched with the bounds each stream reported at discovery.
///
/// Streams that were discovered but contributed no messages are listed with
/// zero counts so their reported deletions still show.
pub fn build_summary_with_info(messages: &[MessageRecord], infos: &[StreamInfo]) -> ReportSummary {
    let mut summary = build_summary(messages, infos.len());

    for info in infos {
        let reported = ReportedBounds {
            first_seq: info.first_seq,
            last_seq: info.last_seq,
            message_count: info.message_count,
        };
        match summary.streams.iter_mut().find(|s| s.name == info.name) {
            Some(stream) => stream.reported = Some(reported),
            None => summary.streams.push(StreamSummary {
                name: info.name.clone(),
                messages: 0,
                bytes: 0,
                first_seq: 0,
                last_seq: 0,
                sequence_span: 0,
                start_time: None,
                end_time: None,
                msg_rate: 0.0,
                seq_rate: 0.0,
                reported: Some(reported),
            }),
        }
    }
    summary
}
