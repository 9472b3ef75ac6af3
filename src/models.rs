//! Data models for the Pension Engine.
//!
//! The `models` module defines the serialisable records that flow in
//! and out of the engine: the raw period records produced by the
//! extraction layer, the canonical [`LaborPeriod`] and
//! [`SalarySegment`] values used internally, and the result structs
//! returned to callers.  All dates serialise as ISO 8601 calendar
//! dates (`YYYY-MM-DD`).

use crate::conservation::Regime;
use crate::overlap::OverlapStrategy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A mid-period wage change as scraped from the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWageChange {
    /// Effective date in `DD/MM/YYYY` form.
    pub date: String,
    /// Daily wage in force from `date` onwards.
    pub daily_wage: f64,
}

/// A labor period exactly as the extraction layer hands it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPeriodRecord {
    /// Employer name.
    pub employer: String,
    /// Employer registration id (registro patronal).
    #[serde(default)]
    pub registration_id: String,
    /// Start date in `DD/MM/YYYY` form.
    pub start: String,
    /// End date in `DD/MM/YYYY` form, the literal `"Vigente"`, or
    /// absent when the employment is still ongoing.
    #[serde(default)]
    pub end: Option<String>,
    /// Base daily wage at the start of the period.
    pub daily_wage: f64,
    #[serde(default)]
    pub wage_changes: Vec<RawWageChange>,
}

/// Everything known about one insured subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectInput {
    /// Optional caller-side identifier, echoed back in the report.
    #[serde(default)]
    pub subject_id: Option<String>,
    /// Issuance date of the weeks report.  Ongoing periods are capped
    /// here and it is the reference date for every calculation.
    pub issued_on: String,
    /// Date of first registration with the institute.
    #[serde(default)]
    pub first_registration: Option<String>,
    /// Officially reported gross weeks ("semanas cotizadas IMSS").
    #[serde(default)]
    pub gross_weeks: Option<u32>,
    /// Weeks discounted because of resource withdrawals.
    #[serde(default)]
    pub discounted_weeks: Option<u32>,
    /// Weeks reinstated after a withdrawal was repaid.
    #[serde(default)]
    pub reinstated_weeks: Option<u32>,
    /// Total weeks stated explicitly on the document, if any.
    #[serde(default)]
    pub reported_total_weeks: Option<u32>,
    /// Per-request override of the configured overlap strategy.
    #[serde(default)]
    pub overlap_strategy: Option<OverlapStrategy>,
    pub periods: Vec<RawPeriodRecord>,
}

/// How a labor period ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "date")]
pub enum PeriodEnd {
    /// The employment ended on this (inclusive) date.
    Closed(NaiveDate),
    /// The employment was still active when the report was issued.
    Ongoing,
}

/// A wage change with a parsed date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WageChange {
    pub date: NaiveDate,
    pub daily_wage: f64,
}

/// A canonical labor period.
///
/// Invariants, enforced by the normalizer: `start <= resolved_end`
/// and every wage change date lies within `[start, resolved_end]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborPeriod {
    pub employer: String,
    pub registration_id: String,
    /// Inclusive first day.
    pub start: NaiveDate,
    pub end: PeriodEnd,
    /// Inclusive last day.  Equals the issuance date for ongoing
    /// periods.
    pub resolved_end: NaiveDate,
    pub daily_wage: f64,
    /// Wage changes sorted by date.
    pub wage_changes: Vec<WageChange>,
}

impl LaborPeriod {
    pub fn is_ongoing(&self) -> bool {
        matches!(self.end, PeriodEnd::Ongoing)
    }

    /// The real end date, `None` while the employment is ongoing.
    pub fn real_end(&self) -> Option<NaiveDate> {
        match self.end {
            PeriodEnd::Closed(date) => Some(date),
            PeriodEnd::Ongoing => None,
        }
    }

    /// Exclusive upper bound of the covered days.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.resolved_end.succ_opt().unwrap_or(self.resolved_end)
    }

    /// Number of calendar days covered, both ends inclusive.
    pub fn days(&self) -> i64 {
        (self.end_exclusive() - self.start).num_days()
    }
}

/// A span of days paid at a single daily wage.
///
/// The range is half-open: `start` is the first day covered and `end`
/// the first day *not* covered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalarySegment {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Daily wage as resolved from the periods.
    pub daily_wage: f64,
    /// Daily wage after applying the cap in force.
    pub adjusted_wage: f64,
    /// Employer the wage is attributed to.  Segments combining several
    /// simultaneous employers join their names with `" + "`.
    pub employer: String,
    pub registration_id: String,
}

impl SalarySegment {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

/// Summary of the overlap correction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    /// Calendar days covered by at least one period.
    pub unique_days: i64,
    /// `unique_days / 7`, floored.
    pub unique_weeks: i64,
    /// Sum of the days of every period taken on its own.
    pub naive_days: i64,
    /// Days removed because several periods covered them.
    pub overlapping_days: i64,
    /// Number of period pairs that share at least one day.
    pub overlapping_pairs: usize,
}

/// Where the authoritative total came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalSource {
    /// Stated explicitly on the source document.
    Reported,
    /// Recomputed as `gross - discounted + reinstated`.
    Computed,
    /// Neither a stated total nor a gross figure was available.
    Unavailable,
}

/// Share of gross weeks lost to discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountImpact {
    None,
    Minor,
    Moderate,
    Significant,
    Severe,
}

/// Weeks figures after discounts and reinstatements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeksTally {
    pub gross_weeks: Option<u32>,
    pub discounted_weeks: u32,
    pub reinstated_weeks: u32,
    /// Authoritative total; `None` only when nothing can support one.
    pub total_weeks: Option<u32>,
    /// `gross - discounted + reinstated`, kept as a cross-check.
    pub computed_total: Option<u32>,
    pub source: TotalSource,
    /// Set when the stated total is more than one week away from the
    /// computed one.
    pub discrepancy: bool,
    /// Discounted weeks as a percentage of gross weeks.
    pub discount_percentage: f64,
    pub discount_impact: DiscountImpact,
    pub observations: Vec<String>,
}

/// Contribution of one segment to the wage average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentContribution {
    pub employer: String,
    pub registration_id: String,
    pub start: NaiveDate,
    /// Exclusive.
    pub end: NaiveDate,
    pub days: i64,
    pub daily_wage: f64,
    pub cap: f64,
    pub adjusted_wage: f64,
    /// `adjusted_wage * days`.
    pub weighted: f64,
}

/// How often the cap of one year was applied inside the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapUsage {
    pub cap: f64,
    pub days_capped: i64,
    /// Sum over the capped days of `daily_wage - cap`.
    pub amount_removed: f64,
}

/// Result of the last-N-weeks wage average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageWindowResult {
    pub window_start: Option<NaiveDate>,
    /// Exclusive.
    pub window_end: Option<NaiveDate>,
    /// Day budget the window tries to fill.
    pub window_budget: i64,
    /// Days actually available, at most `window_budget`.
    pub total_days: i64,
    /// Segments used, oldest first.
    pub segments: Vec<SegmentContribution>,
    /// `Σ(adjusted_wage × days)`.
    pub weighted_sum: f64,
    pub average_daily_wage: f64,
    pub average_monthly_wage: f64,
    pub average_annual_wage: f64,
    pub min_adjusted_wage: f64,
    pub max_adjusted_wage: f64,
    pub days_capped: i64,
    pub caps_applied: BTreeMap<i32, CapUsage>,
    /// `true` when the whole budget could be filled.
    pub full_window: bool,
    pub observations: Vec<String>,
}

impl AverageWindowResult {
    pub fn is_partial(&self) -> bool {
        !self.full_window
    }
}

/// Conservation period length in the units callers ask for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConservationDuration {
    pub weeks: u32,
    pub days: i64,
    pub years: f64,
}

/// Outcome of the conservation-of-rights evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConservationResult {
    pub regime: Regime,
    pub first_registration: NaiveDate,
    pub recognized_weeks: u32,
    pub years_contributed: f64,
    pub duration: ConservationDuration,
    /// Real last cessation, or the issuance date when still employed.
    pub cessation_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub currently_valid: bool,
    pub can_reactivate: bool,
    /// The cessation date is a legal fiction taken from the issuance
    /// date; the result must be recomputed after a real cessation.
    pub is_hypothetical: bool,
    /// Days left until expiration; negative once expired.
    pub days_until_expiration: i64,
    pub criterion: String,
    pub observations: Vec<String>,
}

/// Which downstream calculation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calculation {
    Normalization,
    WeeksTally,
    Conservation,
}

/// A typed failure that stopped one calculation without aborting the
/// others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationFailure {
    pub calculation: Calculation,
    pub error: String,
}

/// The full result set for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub subject_id: Option<String>,
    pub issued_on: NaiveDate,
    pub overlap_strategy: OverlapStrategy,
    pub periods_received: usize,
    pub periods_used: usize,
    pub overlap: OverlapReport,
    pub weeks: WeeksTally,
    pub average: AverageWindowResult,
    pub conservation: Option<ConservationResult>,
    pub failures: Vec<CalculationFailure>,
    /// Every observation raised along the pipeline, in order.
    pub observations: Vec<String>,
}
