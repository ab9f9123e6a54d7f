//! End-to-end tests from dump files through the query API

pub mod dump_pipeline;
pub mod query_api;
