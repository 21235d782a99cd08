//! Category performance: best categories, sorted lists and the combined top chart.

use super::Panel;
use crate::data::clean::CleanedDataset;
use crate::data::provider::DataError;
use crate::data::schema::Column;
use crate::domain::{EtfRecord, Metric};
use crate::metrics::category::{
    aggregate_categories, best_category, sort_by_metric, CategoryAggregate, CategoryPolicy,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_CATEGORIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryView {
    pub total_categories: usize,
    /// Categories with enough records to be offered as a filter.
    pub filterable: Vec<String>,
    pub best_three_year: Panel<CategoryAggregate>,
    pub best_five_year: Panel<CategoryAggregate>,
    pub by_three_year: Panel<Vec<CategoryAggregate>>,
    pub by_five_year: Panel<Vec<CategoryAggregate>>,
    pub by_total_assets: Panel<Vec<CategoryAggregate>>,
    /// First `top_categories` entries of `by_three_year`, carrying both returns.
    pub combined_top: Panel<Vec<CategoryAggregate>>,
    pub all: CategoryAggregate,
    pub blocked_records: usize,
}

impl CategoryView {
    /// Build from a dataset; the dataset must carry a category column.
    pub fn build(
        dataset: &CleanedDataset,
        policy: &CategoryPolicy,
        top_categories: usize,
    ) -> Result<Self, DataError> {
        dataset.columns.require(&[Column::Category])?;
        Ok(Self::from_records(&dataset.records, policy, top_categories))
    }

    pub fn from_records(records: &[EtfRecord], policy: &CategoryPolicy, top_categories: usize) -> Self {
        let report = aggregate_categories(records, policy);
        let sorted = |metric| -> Vec<CategoryAggregate> {
            sort_by_metric(&report.categories, metric)
                .into_iter()
                .cloned()
                .collect()
        };
        let best = |metric| Panel::from_option(best_category(&report.categories, metric).cloned());

        let by_three_year = sorted(Metric::ThreeYearReturn);
        let combined_top: Vec<CategoryAggregate> = by_three_year
            .iter()
            .take(top_categories)
            .cloned()
            .collect();

        Self {
            total_categories: report.categories.len(),
            best_three_year: best(Metric::ThreeYearReturn),
            best_five_year: best(Metric::FiveYearReturn),
            by_five_year: Panel::from_vec(sorted(Metric::FiveYearReturn)),
            by_total_assets: Panel::from_vec(sorted(Metric::TotalAssets)),
            combined_top: Panel::from_vec(combined_top),
            by_three_year: Panel::from_vec(by_three_year),
            filterable: report.filterable,
            all: report.all,
            blocked_records: report.blocked_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::clean_csv;

    #[test]
    fn requires_category_column() {
        let dataset = clean_csv("symbol,threeYearAverageReturn\nAAA,0.1\n").unwrap();
        let err = CategoryView::build(&dataset, &CategoryPolicy::default(), 10).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }

    #[test]
    fn builds_sorted_lists() {
        let csv = "symbol,category,threeYearAverageReturn,fiveYearAverageReturn,totalAssets\n\
                   A,Tech,0.10,0.12,100\n\
                   B,Tech,0.20,0.14,200\n\
                   C,Health,0.05,0.20,900\n\
                   D,Bonds,,,50\n";
        let dataset = clean_csv(csv).unwrap();
        let view = CategoryView::build(&dataset, &CategoryPolicy::default(), 1).unwrap();

        assert_eq!(view.total_categories, 3);
        assert!(view.filterable.is_empty());
        assert_eq!(view.best_three_year.ready().unwrap().category, "Tech");
        assert_eq!(view.best_five_year.ready().unwrap().category, "Health");

        let by_assets: Vec<&str> = view
            .by_total_assets
            .ready()
            .unwrap()
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(by_assets, vec!["Health", "Tech", "Bonds"]);

        assert_eq!(view.by_three_year.ready().unwrap().len(), 2);
        let combined = view.combined_top.ready().unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].category, "Tech");
        assert!(combined[0].avg_five_year_return.is_some());
    }

    #[test]
    fn no_categories_means_no_data() {
        let view = CategoryView::from_records(&[EtfRecord::new("A")], &CategoryPolicy::default(), 10);
        assert_eq!(view.total_categories, 0);
        assert_eq!(view.best_three_year, Panel::NoData);
        assert_eq!(view.combined_top, Panel::NoData);
        assert_eq!(view.all.record_count, 1);
    }
}
