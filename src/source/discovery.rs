use super::StreamSource;
use crate::errors::{AppResult, SourceError};
use crate::types::{RetentionPolicy, StreamInfo};
use tracing::{debug, info, warn};

/// Enumerate limits-retention streams with at least one stored message
///
/// With a non-empty `filters` list only the named streams are considered.
/// Named streams with another retention policy, or that do not exist, are
/// skipped with a warning. Results are sorted by name.
pub async fn discover_streams(
    source: &dyn StreamSource,
    filters: &[String],
) -> AppResult<Vec<StreamInfo>> {
    let all = source.list_streams().await?;
    let mut found = Vec::new();

    for info in all {
        if !filters.is_empty() && !filters.contains(&info.name) {
            continue;
        }
        if info.retention != RetentionPolicy::Limits {
            let err = SourceError::NotLimitsRetention {
                name: info.name.clone(),
                policy: info.retention.to_string(),
            };
            if filters.is_empty() {
                debug!("Skipping {}", err);
            } else {
                warn!("{}", err);
            }
            continue;
        }
        if info.message_count == 0 {
            debug!("Skipping empty stream {}", info.name);
            continue;
        }
        found.push(info);
    }

    for name in filters {
        if !found.iter().any(|s| &s.name == name) {
            warn!("Requested stream {} not found among limits streams", name);
        }
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    info!("Discovered {} limits-retention streams", found.len());
    Ok(found)
}
