//! Unit tests for histogram construction, statistics and exports

pub mod csv_export;
pub mod downsample_properties;
pub mod histogram_properties;
pub mod rate_stats;
