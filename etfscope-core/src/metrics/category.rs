//! Per-category aggregates.
//!
//! Records are grouped by their category label in first-appearance order.
//! Returns are averaged over valid values only and total assets are summed;
//! an aggregate with no valid values for a metric reports `None` for it.
//!
//! Two independent filters apply:
//! - the blocklist removes placeholder/test categories (case-insensitive
//!   substring match) from everything, including the "All" aggregate;
//! - the minimum sample count only decides which categories are offered in
//!   the filterable list.

use super::stats::{mean, sum_opt};
use crate::domain::{EtfRecord, Metric};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_SAMPLES: usize = 10;
pub const ALL_CATEGORIES: &str = "All";

/// Grouping rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryPolicy {
    pub min_samples: usize,
    pub blocklist: Vec<String>,
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            blocklist: vec!["Insider".into(), "TEST".into(), "Placeholder".into()],
        }
    }
}

impl CategoryPolicy {
    pub fn is_blocked(&self, category: &str) -> bool {
        let lower = category.to_lowercase();
        self.blocklist
            .iter()
            .filter(|marker| !marker.is_empty())
            .any(|marker| lower.contains(&marker.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    pub category: String,
    pub record_count: usize,
    /// Fraction.
    pub avg_three_year_return: Option<f64>,
    /// Fraction.
    pub avg_five_year_return: Option<f64>,
    pub total_assets: Option<f64>,
}

impl CategoryAggregate {
    fn from_records<'a>(category: &str, records: impl IntoIterator<Item = &'a EtfRecord>) -> Self {
        let mut count = 0;
        let mut three = Vec::new();
        let mut five = Vec::new();
        let mut assets = Vec::new();
        for r in records {
            count += 1;
            three.extend(r.three_year_return);
            five.extend(r.five_year_return);
            assets.extend(r.total_assets);
        }
        Self {
            category: category.to_string(),
            record_count: count,
            avg_three_year_return: mean(&three),
            avg_five_year_return: mean(&five),
            total_assets: sum_opt(&assets),
        }
    }

    /// Aggregate value for a metric. Only returns and total assets are aggregated.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::ThreeYearReturn => self.avg_three_year_return,
            Metric::FiveYearReturn => self.avg_five_year_return,
            Metric::TotalAssets => self.total_assets,
            Metric::DividendYield | Metric::TrailingPe => None,
        }
    }
}

/// Result of grouping a record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    /// Every non-blocked category, in first-appearance order.
    pub categories: Vec<CategoryAggregate>,
    /// Names of categories with at least `min_samples` records.
    pub filterable: Vec<String>,
    /// Aggregate over every non-blocked record, categorized or not.
    pub all: CategoryAggregate,
    pub blocked_records: usize,
    pub uncategorized_records: usize,
}

impl CategoryReport {
    pub fn get(&self, category: &str) -> Option<&CategoryAggregate> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn is_filterable(&self, category: &str) -> bool {
        self.filterable.iter().any(|c| c == category)
    }
}

/// Group records by category.
pub fn aggregate_categories(records: &[EtfRecord], policy: &CategoryPolicy) -> CategoryReport {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: Vec<Vec<&EtfRecord>> = Vec::new();
    let mut kept: Vec<&EtfRecord> = Vec::with_capacity(records.len());
    let mut blocked_records = 0;
    let mut uncategorized_records = 0;

    for record in records {
        if policy.is_blocked(&record.category) {
            blocked_records += 1;
            continue;
        }
        kept.push(record);
        if !record.has_category() {
            uncategorized_records += 1;
            continue;
        }
        match order.iter().position(|c| *c == record.category) {
            Some(i) => groups[i].push(record),
            None => {
                order.push(&record.category);
                groups.push(vec![record]);
            }
        }
    }

    let categories: Vec<CategoryAggregate> = order
        .iter()
        .zip(&groups)
        .map(|(name, members)| CategoryAggregate::from_records(name, members.iter().copied()))
        .collect();

    let filterable = categories
        .iter()
        .filter(|c| c.record_count >= policy.min_samples)
        .map(|c| c.category.clone())
        .collect();

    if blocked_records > 0 {
        log::debug!("category.blocked records={blocked_records}");
    }

    CategoryReport {
        categories,
        filterable,
        all: CategoryAggregate::from_records(ALL_CATEGORIES, kept),
        blocked_records,
        uncategorized_records,
    }
}

/// Highest aggregate for a metric; on a tie the earlier category wins.
pub fn best_category(categories: &[CategoryAggregate], metric: Metric) -> Option<&CategoryAggregate> {
    let mut best: Option<(&CategoryAggregate, f64)> = None;
    for cat in categories {
        let Some(v) = cat.value(metric) else {
            continue;
        };
        match best {
            Some((_, top)) if v <= top => {}
            _ => best = Some((cat, v)),
        }
    }
    best.map(|(cat, _)| cat)
}

/// Categories with a value for `metric`, highest first; ties keep input order.
pub fn sort_by_metric(categories: &[CategoryAggregate], metric: Metric) -> Vec<&CategoryAggregate> {
    let mut sorted: Vec<(&CategoryAggregate, f64)> = categories
        .iter()
        .filter_map(|c| c.value(metric).map(|v| (c, v)))
        .collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    sorted.into_iter().map(|(c, _)| c).collect()
}
