//! Wage average over the last contribution weeks.
//!
//! Walks the salary segments from the most recent backwards, skipping
//! gaps, until the day budget (250 weeks) is filled or the history runs
//! out.  Each segment's wage is capped with the cap of the year the
//! used part of the segment starts in, and the result is the
//! day-weighted mean of the capped wages.  A short history yields an
//! average over the days that exist, flagged as a partial window.

use crate::caps::WageCapTable;
use crate::models::{AverageWindowResult, CapUsage, SalarySegment, SegmentContribution};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// 250 weeks.
pub const WINDOW_DAYS: i64 = 1750;
/// Average days per month used for the monthly figure.
pub const DAYS_PER_MONTH: f64 = 30.4;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Compute the weighted average of the most recent `budget` days of
/// contribution up to and including `reference`.
pub fn weighted_average(
    segments: &[SalarySegment],
    reference: NaiveDate,
    budget: i64,
    caps: &WageCapTable,
) -> AverageWindowResult {
    let limit = reference.succ_opt().unwrap_or(reference);
    let mut ordered: Vec<&SalarySegment> = segments.iter().collect();
    ordered.sort_by(|a, b| b.end.cmp(&a.end));

    let mut remaining = budget.max(0);
    let mut contributions: Vec<SegmentContribution> = Vec::new();
    for segment in ordered {
        if remaining == 0 {
            break;
        }
        let end = segment.end.min(limit);
        if end <= segment.start {
            continue;
        }
        let available = (end - segment.start).num_days();
        let days = available.min(remaining);
        let start = end - Duration::days(days);
        let (adjusted_wage, cap) = caps.apply(segment.daily_wage, start.year());
        contributions.push(SegmentContribution {
            employer: segment.employer.clone(),
            registration_id: segment.registration_id.clone(),
            start,
            end,
            days,
            daily_wage: segment.daily_wage,
            cap,
            adjusted_wage,
            weighted: adjusted_wage * days as f64,
        });
        remaining -= days;
    }
    contributions.reverse();

    let total_days: i64 = contributions.iter().map(|c| c.days).sum();
    let weighted_sum: f64 = contributions.iter().map(|c| c.weighted).sum();
    let full_window = budget > 0 && total_days >= budget;
    let mut observations = Vec::new();

    let average_daily_wage = if total_days > 0 {
        weighted_sum / total_days as f64
    } else {
        observations.push("No valid periods available for the wage average; average set to 0".to_string());
        0.0
    };

    if full_window {
        observations.push(format!("Full window: last {} weeks ({budget} days)", budget / 7));
    } else if total_days > 0 {
        observations.push(format!(
            "Partial window: only {} weeks ({total_days} days) of the {} required ({budget} days); \
             the average covers the available days only",
            total_days / 7,
            budget / 7
        ));
    }

    let mut caps_applied: BTreeMap<i32, CapUsage> = BTreeMap::new();
    let mut days_capped = 0;
    for c in contributions.iter().filter(|c| c.daily_wage > c.cap) {
        days_capped += c.days;
        let usage = caps_applied.entry(c.start.year()).or_insert(CapUsage {
            cap: c.cap,
            days_capped: 0,
            amount_removed: 0.0,
        });
        usage.days_capped += c.days;
        usage.amount_removed += (c.daily_wage - c.cap) * c.days as f64;
    }
    if days_capped > 0 {
        observations.push(format!("Wage cap applied to {days_capped} days of the window"));
    }

    let min_adjusted_wage = contributions.iter().map(|c| c.adjusted_wage).reduce(f64::min).unwrap_or(0.0);
    let max_adjusted_wage = contributions.iter().map(|c| c.adjusted_wage).reduce(f64::max).unwrap_or(0.0);

    tracing::debug!(total_days, average_daily_wage, full_window, "computed wage average");

    AverageWindowResult {
        window_start: contributions.first().map(|c| c.start),
        window_end: contributions.last().map(|c| c.end),
        window_budget: budget,
        total_days,
        segments: contributions,
        weighted_sum,
        average_daily_wage,
        average_monthly_wage: average_daily_wage * DAYS_PER_MONTH,
        average_annual_wage: average_daily_wage * DAYS_PER_YEAR,
        min_adjusted_wage,
        max_adjusted_wage,
        days_capped,
        caps_applied,
        full_window,
        observations,
    }
}
