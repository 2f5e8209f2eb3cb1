//! Revisable economic indicator observations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::asof::Vintage;

/// One vintage of one economic series value.
///
/// `knowledge_date` is the realtime start of the vintage: the first day this
/// value was published. Several points of the same series may describe the
/// same period with different knowledge dates (revisions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicSeriesPoint {
    pub series_id: String,
    /// Period the value describes, when the source provides it.
    pub observation_date: Option<NaiveDate>,
    pub knowledge_date: NaiveDate,
    /// `None` for a published gap (e.g. FRED's "." placeholder).
    pub value: Option<f64>,
}

/// Within one vintage, the newest observation period is the current value.
impl Vintage for EconomicSeriesPoint {
    type TieKey = Option<NaiveDate>;

    fn knowledge_date(&self) -> NaiveDate {
        self.knowledge_date
    }

    fn tie_key(&self) -> Self::TieKey {
        self.observation_date
    }
}
