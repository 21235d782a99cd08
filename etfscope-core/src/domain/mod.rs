//! Domain types for etfscope

pub mod etf;

pub use etf::{EtfRecord, Metric};
