//! Rental pricing.
//!
//! A rental is billed per calendar day between pickup and the planned return,
//! with at least one day charged. Returning late adds a penalty of one daily
//! rate for every started block of `penalty_block_hours`, but only once the
//! delay reaches a full block.

use chrono::{DateTime, Utc};

use crate::storage::AgencyConfig;

pub const DEFAULT_PENALTY_BLOCK_HOURS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    pub penalty_block_hours: i64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            penalty_block_hours: DEFAULT_PENALTY_BLOCK_HOURS,
        }
    }
}

impl From<&AgencyConfig> for BillingPolicy {
    fn from(config: &AgencyConfig) -> Self {
        Self {
            penalty_block_hours: config.penalty_block_hours.max(1),
        }
    }
}

/// Breakdown of what a finished rental costs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RentalBill {
    pub billable_days: i64,
    pub late_hours: i64,
    pub base: f64,
    pub penalty: f64,
    pub total: f64,
}

impl BillingPolicy {
    /// Calendar days from pickup to planned return, never less than one
    pub fn billable_days(&self, start: DateTime<Utc>, planned_return: DateTime<Utc>) -> i64 {
        (planned_return.date_naive() - start.date_naive())
            .num_days()
            .max(1)
    }

    /// Whole hours past the planned return (zero when on time or early)
    pub fn late_hours(&self, planned_return: DateTime<Utc>, actual_return: DateTime<Utc>) -> i64 {
        (actual_return - planned_return).num_hours().max(0)
    }

    pub fn penalty(&self, daily_rate: f64, late_hours: i64) -> f64 {
        let block = self.penalty_block_hours.max(1);
        if late_hours < block {
            return 0.0;
        }
        let blocks = (late_hours + block - 1) / block;
        blocks as f64 * daily_rate
    }

    /// Price quoted up front for a rental of `days` days
    pub fn quote(&self, daily_rate: f64, days: i64) -> f64 {
        daily_rate * days.max(1) as f64
    }

    pub fn bill(
        &self,
        daily_rate: f64,
        start: DateTime<Utc>,
        planned_return: DateTime<Utc>,
        actual_return: DateTime<Utc>,
    ) -> RentalBill {
        let billable_days = self.billable_days(start, planned_return);
        let late_hours = self.late_hours(planned_return, actual_return);
        let base = daily_rate * billable_days as f64;
        let penalty = self.penalty(daily_rate, late_hours);

        RentalBill {
            billable_days,
            late_hours,
            base,
            penalty,
            total: base + penalty,
        }
    }
}
