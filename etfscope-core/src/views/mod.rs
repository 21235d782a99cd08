//! Chart-ready views built from a cleaned dataset.
//!
//! Views are recomputed from scratch on every load. Each chart or KPI is a
//! [`Panel`] so an empty valid-value set renders as "no data" instead of zero.

pub mod category;
pub mod overview;
pub mod top;

pub use category::CategoryView;
pub use overview::{OverviewView, PeSource};
pub use top::TopPerformersView;

use serde::{Deserialize, Serialize};

/// One chart or KPI: either ready to render or explicitly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    NoData,
}

impl<T> Panel<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Panel::Ready(v),
            None => Panel::NoData,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Panel::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(v) => Some(v),
            Panel::NoData => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Panel<U> {
        match self {
            Panel::Ready(v) => Panel::Ready(f(v)),
            Panel::NoData => Panel::NoData,
        }
    }
}

impl<T> Panel<Vec<T>> {
    /// `NoData` for an empty list.
    pub fn from_vec(values: Vec<T>) -> Self {
        if values.is_empty() {
            Panel::NoData
        } else {
            Panel::Ready(values)
        }
    }
}

/// Fraction to percent, for display only.
pub fn to_percent(fraction: f64) -> f64 {
    fraction * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vec_is_no_data() {
        assert_eq!(Panel::<Vec<u8>>::from_vec(vec![]), Panel::NoData);
        assert!(Panel::from_vec(vec![1]).is_ready());
    }

    #[test]
    fn panel_serializes_with_state_tag() {
        let json = serde_json::to_string(&Panel::Ready(1.5)).unwrap();
        assert_eq!(json, r#"{"state":"ready","data":1.5}"#);
        let json = serde_json::to_string(&Panel::<f64>::NoData).unwrap();
        assert_eq!(json, r#"{"state":"no_data"}"#);
    }

    #[test]
    fn percent_scaling() {
        assert!((to_percent(0.15) - 15.0).abs() < 1e-12);
    }
}
