//! Fixed-bin histograms over half-open ranges.
//!
//! Bin policy:
//! - each bin covers `[min, max)`; a value equal to a bin's `max` belongs to the
//!   bin whose `min` equals it (if any), never to both;
//! - values below every `min` or at/above every `max`, and values in a gap
//!   between bins, land in no bin and are counted in `out_of_range`;
//! - output order is the order the bins were declared in.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One declared bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub min: f64,
    pub max: f64,
    pub label: String,
}

impl Bin {
    pub fn new(min: f64, max: f64, label: impl Into<String>) -> Self {
        Self {
            min,
            max,
            label: label.into(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }

    fn overlaps(&self, other: &Bin) -> bool {
        self.min < other.max && other.min < self.max
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BinError {
    #[error("bin specification has no bins")]
    NoBins,

    #[error("bin '{label}' has non-finite bounds")]
    NonFinite { label: String },

    #[error("bin '{label}' is empty: min must be below max")]
    EmptyRange { label: String },

    #[error("bins '{first}' and '{second}' overlap")]
    Overlap { first: String, second: String },
}

/// An ordered, validated list of non-overlapping bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    bins: Vec<Bin>,
}

impl BinSpec {
    pub fn new(bins: Vec<Bin>) -> Result<Self, BinError> {
        if bins.is_empty() {
            return Err(BinError::NoBins);
        }
        for bin in &bins {
            if !bin.min.is_finite() || !bin.max.is_finite() {
                return Err(BinError::NonFinite {
                    label: bin.label.clone(),
                });
            }
            if bin.min >= bin.max {
                return Err(BinError::EmptyRange {
                    label: bin.label.clone(),
                });
            }
        }
        for (i, a) in bins.iter().enumerate() {
            for b in &bins[i + 1..] {
                if a.overlaps(b) {
                    return Err(BinError::Overlap {
                        first: a.label.clone(),
                        second: b.label.clone(),
                    });
                }
            }
        }
        Ok(Self { bins })
    }

    /// Dividend-yield bins (percent). The last bin is labelled "5%+" but stops at 10.
    pub fn dividend_yield() -> Self {
        Self {
            bins: vec![
                Bin::new(0.0, 1.0, "0-1%"),
                Bin::new(1.0, 2.0, "1-2%"),
                Bin::new(2.0, 3.0, "2-3%"),
                Bin::new(3.0, 4.0, "3-4%"),
                Bin::new(4.0, 5.0, "4-5%"),
                Bin::new(5.0, 10.0, "5%+"),
            ],
        }
    }

    /// Trailing P/E bins. The last bin is labelled "40+" but stops at 100.
    pub fn trailing_pe() -> Self {
        Self {
            bins: vec![
                Bin::new(0.0, 10.0, "0-10"),
                Bin::new(10.0, 15.0, "10-15"),
                Bin::new(15.0, 20.0, "15-20"),
                Bin::new(20.0, 25.0, "20-25"),
                Bin::new(25.0, 30.0, "25-30"),
                Bin::new(30.0, 40.0, "30-40"),
                Bin::new(40.0, 100.0, "40+"),
            ],
        }
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Index of the bin a value falls into.
    pub fn locate(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        self.bins.iter().position(|b| b.contains(value))
    }

    /// Count values per bin.
    pub fn bucket(&self, values: &[f64]) -> Histogram {
        let mut counts = vec![0usize; self.bins.len()];
        let mut out_of_range = 0;
        for &v in values {
            match self.locate(v) {
                Some(i) => counts[i] += 1,
                None => out_of_range += 1,
            }
        }
        Histogram {
            bins: self
                .bins
                .iter()
                .zip(counts)
                .map(|(bin, count)| HistogramBin {
                    range_label: bin.label.clone(),
                    count,
                })
                .collect(),
            out_of_range,
        }
    }
}

/// Count for one bin, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub range_label: String,
    pub count: usize,
}

/// Bucketing result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    /// Values that fell in no bin.
    pub out_of_range: usize,
}

impl Histogram {
    /// Values counted in some bin.
    pub fn in_range(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// All values seen, binned or not.
    pub fn total(&self) -> usize {
        self.in_range() + self.out_of_range
    }

    /// No value landed in any bin.
    pub fn is_empty(&self) -> bool {
        self.in_range() == 0
    }

    pub fn count(&self, label: &str) -> Option<usize> {
        self.bins
            .iter()
            .find(|b| b.range_label == label)
            .map(|b| b.count)
    }
}
