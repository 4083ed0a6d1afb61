//! Business-intelligence summaries over cleaned sales records.

use crate::columns::{
    SITE_CANDIDATES, SPEND_CANDIDATES, TIP_CANDIDATES, VISITORS_CANDIDATES, resolve_column,
};
use crate::imputation::QuantityRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Upper bound of the zoomed quantity histogram.
pub const DEFAULT_HISTOGRAM_MAX: i64 = 5;
/// Whisker reach in multiples of the interquartile range.
const WHISKER_IQR_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SalesRecord {
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub total_spend: Option<f64>,
    #[serde(default)]
    pub visitors: Option<f64>,
    #[serde(default)]
    pub tip: Option<f64>,
}

/// Raw sales rows under a loosely named header row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SalesTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SalesTable {
    /// Map rows onto `SalesRecord`s through the resolved columns.
    ///
    /// A column that cannot be resolved leaves the matching field empty on
    /// every record, so the metrics depending on it come out as `None`.
    pub fn to_records(&self) -> Vec<SalesRecord> {
        let site = self.column_index(SITE_CANDIDATES);
        let spend = self.column_index(SPEND_CANDIDATES);
        let visitors = self.column_index(VISITORS_CANDIDATES);
        let tip = self.column_index(TIP_CANDIDATES);
        debug!(?site, ?spend, ?visitors, ?tip, "Sales columns resolved");

        self.rows
            .iter()
            .map(|row| SalesRecord {
                site: cell(row, site).and_then(text_value),
                total_spend: cell(row, spend).and_then(numeric_value),
                visitors: cell(row, visitors).and_then(numeric_value),
                tip: cell(row, tip).and_then(numeric_value),
            })
            .collect()
    }

    fn column_index(&self, candidates: &[&str]) -> Option<usize> {
        let name = resolve_column(self.headers.as_slice(), candidates)?;
        self.headers.iter().position(|h| *h == name)
    }
}

fn cell(row: &[Value], index: Option<usize>) -> Option<&Value> {
    row.get(index?)
}

fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub record_count: usize,
    /// `None` when no record carries a spend value.
    pub total_revenue: Option<f64>,
    pub mean_visitors: Option<f64>,
    pub top_site: Option<String>,
    /// Box-plot statistics of visitors, one entry per site in site order.
    pub visitors_by_site: Vec<VisitorDistribution>,
    pub spend_vs_tip: SpendTipRelation,
}

/// Quartiles, whiskers and outliers of the visitor counts recorded for one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitorDistribution {
    pub site: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpendTipPair {
    pub total_spend: f64,
    pub tip: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendTipRelation {
    pub pairs: Vec<SpendTipPair>,
    /// Pearson correlation; `None` below two pairs or when either side is constant.
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    pub value: i64,
    pub count: usize,
}

pub fn summarize_sales(records: &[SalesRecord]) -> SalesSummary {
    let spends: Vec<f64> = records
        .iter()
        .filter_map(|r| r.total_spend)
        .filter(|v| v.is_finite())
        .collect();
    let visitors: Vec<f64> = records
        .iter()
        .filter_map(|r| r.visitors)
        .filter(|v| v.is_finite())
        .collect();

    let total_revenue = (!spends.is_empty()).then(|| spends.iter().sum::<f64>());
    let mean_visitors =
        (!visitors.is_empty()).then(|| visitors.iter().sum::<f64>() / visitors.len() as f64);

    SalesSummary {
        record_count: records.len(),
        total_revenue,
        mean_visitors,
        top_site: top_site_by_revenue(records),
        visitors_by_site: visitors_by_site(records),
        spend_vs_tip: spend_vs_tip(records),
    }
}

/// Site with the largest summed spend; ties go to the lexicographically first site.
fn top_site_by_revenue(records: &[SalesRecord]) -> Option<String> {
    let mut by_site: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        if let (Some(site), Some(spend)) = (record.site.as_deref(), record.total_spend)
            && spend.is_finite()
        {
            *by_site.entry(site).or_insert(0.0) += spend;
        }
    }
    let mut best: Option<(&str, f64)> = None;
    for (site, total) in by_site {
        match best {
            Some((_, best_total)) if total <= best_total => {}
            _ => best = Some((site, total)),
        }
    }
    best.map(|(site, _)| site.to_string())
}

pub fn visitors_by_site(records: &[SalesRecord]) -> Vec<VisitorDistribution> {
    let mut by_site: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let (Some(site), Some(visitors)) = (record.site.as_deref(), record.visitors)
            && visitors.is_finite()
        {
            by_site.entry(site).or_default().push(visitors);
        }
    }
    by_site
        .into_iter()
        .filter_map(|(site, values)| distribution(site, values))
        .collect()
}

fn distribution(site: &str, mut values: Vec<f64>) -> Option<VisitorDistribution> {
    values.sort_by(f64::total_cmp);
    let min = *values.first()?;
    let max = *values.last()?;
    let q1 = quantile(&values, 0.25);
    let median = quantile(&values, 0.5);
    let q3 = quantile(&values, 0.75);
    let reach = WHISKER_IQR_FACTOR * (q3 - q1);
    let (low_fence, high_fence) = (q1 - reach, q3 + reach);

    let inside = values.iter().copied().filter(|v| (low_fence..=high_fence).contains(v));
    let lower_whisker = inside.clone().fold(f64::INFINITY, f64::min);
    let upper_whisker = inside.fold(f64::NEG_INFINITY, f64::max);
    let outliers = values
        .iter()
        .copied()
        .filter(|v| !(low_fence..=high_fence).contains(v))
        .collect();

    Some(VisitorDistribution {
        site: site.to_string(),
        count: values.len(),
        min,
        q1,
        median,
        q3,
        max,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

/// Linearly interpolated quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

pub fn spend_vs_tip(records: &[SalesRecord]) -> SpendTipRelation {
    let pairs: Vec<SpendTipPair> = records
        .iter()
        .filter_map(|r| match (r.total_spend, r.tip) {
            (Some(total_spend), Some(tip)) if total_spend.is_finite() && tip.is_finite() => {
                Some(SpendTipPair { total_spend, tip })
            }
            _ => None,
        })
        .collect();
    let correlation = pearson(&pairs);
    SpendTipRelation { pairs, correlation }
}

fn pearson(pairs: &[SpendTipPair]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.total_spend).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.tip).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for pair in pairs {
        let dx = pair.total_spend - mean_x;
        let dy = pair.tip - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denominator = (var_x * var_y).sqrt();
    (denominator > 0.0).then(|| cov / denominator)
}

/// Counts of each quantity in `1..=max_value`; missing and out-of-range values are skipped.
pub fn quantity_histogram(records: &[QuantityRecord], max_value: i64) -> Vec<HistogramBin> {
    let mut bins: Vec<HistogramBin> = (1..=max_value)
        .map(|value| HistogramBin { value, count: 0 })
        .collect();
    for quantity in records.iter().filter_map(|r| r.quantity) {
        if (1..=max_value).contains(&quantity) {
            bins[(quantity - 1) as usize].count += 1;
        }
    }
    bins
}
