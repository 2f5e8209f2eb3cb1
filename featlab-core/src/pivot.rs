//! Wide Pivot Aggregator for economic indicator series.
//!
//! The set of series is a declarative table of `series_id → column`. Each
//! column is filled by an as-of lookup against that series' vintages. The
//! result depends only on the date, so it is computed once per distinct
//! feature date and shared by every symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::asof::VintageIndex;
use crate::domain::EconomicSeriesPoint;

/// One entry of the series catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesColumn {
    pub series_id: String,
    pub column: String,
}

impl SeriesColumn {
    pub fn new(series_id: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            column: column.into(),
        }
    }
}

/// Built-in FRED series ids. Column names are `econ_` + the lowercased id.
const DEFAULT_SERIES: [&str; 29] = [
    // rates and curve
    "FEDFUNDS",
    "DGS10",
    "DGS2",
    "DGS3MO",
    "T10Y2Y",
    "T10Y3M",
    "MORTGAGE30US",
    "BAMLH0A0HYM2",
    // prices
    "CPIAUCSL",
    "CPILFESL",
    "PCEPI",
    "PCEPILFE",
    "PPIACO",
    // labor
    "UNRATE",
    "PAYEMS",
    "ICSA",
    "CIVPART",
    // output and activity
    "GDP",
    "GDPC1",
    "INDPRO",
    "TCU",
    "RSAFS",
    "HOUST",
    "PERMIT",
    "UMCSENT",
    // money and markets
    "M2SL",
    "VIXCLS",
    "DTWEXBGS",
    "DCOILWTICO",
];

/// The default 29-series catalog.
pub fn default_series_catalog() -> Vec<SeriesColumn> {
    DEFAULT_SERIES
        .iter()
        .map(|id| SeriesColumn::new(*id, format!("econ_{}", id.to_ascii_lowercase())))
        .collect()
}

/// Pivoted economic values for one as-of date, positional to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct EconomicRow {
    pub as_of: NaiveDate,
    pub values: Vec<Option<f64>>,
    /// Latest knowledge date among the vintages that supplied a value.
    pub known_at: Option<NaiveDate>,
}

/// Economic vintages indexed per catalog series.
#[derive(Debug, Clone)]
pub struct EconomicPivot {
    catalog: Vec<SeriesColumn>,
    index: VintageIndex<String, EconomicSeriesPoint>,
    /// Points whose series id is not in the catalog.
    pub ignored_points: usize,
}

impl EconomicPivot {
    /// Index the points of catalog series; points of other series are
    /// ignored. Catalog series missing from the source pivot to null.
    pub fn new(catalog: Vec<SeriesColumn>, points: Vec<EconomicSeriesPoint>) -> Self {
        let wanted: HashSet<&str> = catalog.iter().map(|s| s.series_id.as_str()).collect();
        let total = points.len();
        let kept: Vec<EconomicSeriesPoint> = points
            .into_iter()
            .filter(|p| wanted.contains(p.series_id.as_str()))
            .collect();
        let ignored_points = total - kept.len();
        let index = VintageIndex::build(kept, |p: &EconomicSeriesPoint| p.series_id.clone());
        if ignored_points > 0 {
            debug!(ignored_points, "economic points outside the series catalog");
        }
        Self {
            catalog,
            index,
            ignored_points,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.catalog.iter().map(|s| s.column.as_str())
    }

    /// `pivot(asOfDate)` for the configured series.
    pub fn pivot(&self, as_of: NaiveDate) -> EconomicRow {
        let mut known_at = None;
        let values = self
            .catalog
            .iter()
            .map(|s| {
                let point = self.index.as_of(s.series_id.as_str(), as_of)?;
                let value = point.value?;
                known_at = known_at.max(Some(point.knowledge_date));
                Some(value)
            })
            .collect();
        EconomicRow {
            as_of,
            values,
            known_at,
        }
    }

    /// Pivot every date in `dates`, one sweep per series.
    ///
    /// Equivalent to calling [`pivot`](Self::pivot) per date.
    pub fn pivot_dates<I>(&self, dates: I) -> BTreeMap<NaiveDate, EconomicRow>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();

        let mut rows: Vec<EconomicRow> = dates
            .iter()
            .map(|&as_of| EconomicRow {
                as_of,
                values: Vec::with_capacity(self.catalog.len()),
                known_at: None,
            })
            .collect();

        for s in &self.catalog {
            match self.index.timeline(s.series_id.as_str()) {
                Some(timeline) => {
                    for (row, point) in rows.iter_mut().zip(timeline.sweep(&dates)) {
                        let value = point.and_then(|p| p.value);
                        if value.is_some() {
                            row.known_at = row.known_at.max(point.map(|p| p.knowledge_date));
                        }
                        row.values.push(value);
                    }
                }
                None => rows.iter_mut().for_each(|row| row.values.push(None)),
            }
        }

        debug!(dates = rows.len(), series = self.catalog.len(), "economic pivot computed");
        rows.into_iter().map(|r| (r.as_of, r)).collect()
    }
}
