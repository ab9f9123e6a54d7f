pub mod args;
pub mod explore;
pub mod report;
pub mod serve;
pub mod streams;
