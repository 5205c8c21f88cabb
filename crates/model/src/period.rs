//! PSURPeriod and the interval arithmetic the period engine (§4.E) builds on.

use crate::Jurisdiction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PSURPeriod {
    pub period_id: String,
    pub psur_ref: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub jurisdiction: Jurisdiction,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub device_class: Option<String>,
}

impl PSURPeriod {
    pub fn new(
        period_id: impl Into<String>,
        psur_ref: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        jurisdiction: Jurisdiction,
        device_class: Option<String>,
    ) -> Self {
        Self {
            period_id: period_id.into(),
            psur_ref: psur_ref.into(),
            start_date,
            end_date,
            jurisdiction,
            device_class,
        }
    }

    /// Inclusive-bounds overlap: true iff the two closed intervals share at least one day.
    pub fn overlaps(&self, other: &PSURPeriod) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }

    /// True if `other` starts more than one day after `self` ends (a gap between them).
    /// Periods are expected to be contiguous: `other.start_date == self.end_date + 1 day`.
    pub fn has_gap(&self, other: &PSURPeriod) -> bool {
        let expected_next = self.end_date.succ_opt().expect("date overflow");
        other.start_date > expected_next
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}
