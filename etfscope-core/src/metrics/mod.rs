//! Derived metrics: histograms, rankings, category aggregates, descriptive stats.
//!
//! Everything here is a pure function of a cleaned record set.

pub mod category;
pub mod histogram;
pub mod rank;
pub mod stats;

pub use category::{
    aggregate_categories, best_category, sort_by_metric, CategoryAggregate, CategoryPolicy,
    CategoryReport,
};
pub use histogram::{Bin, BinError, BinSpec, Histogram, HistogramBin};
pub use rank::{rank_records, top_n, RankedEntry, DEFAULT_TOP_N};
pub use stats::{mean, median, median_opt, sum, sum_opt, valid_values};
