//! Overlap resolution.
//!
//! Several employers may report the same calendar days.  This module
//! merges the periods into a [`ContributionDaySet`] (each day counted
//! once) and into an ordered list of non-overlapping
//! [`SalarySegment`]s.  Which wage a doubly-covered day carries is
//! decided by an [`OverlapPolicy`]; two policies exist because
//! different legal computations use different overlap semantics.
//!
//! The pass is an interval sweep over period boundaries, so cost grows
//! with the number of periods and wage changes, not with the number of
//! days they span.

use crate::caps::WageCapTable;
use crate::models::{LaborPeriod, OverlapReport, SalarySegment};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Selects the [`OverlapPolicy`] used for doubly-covered days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapStrategy {
    /// The lowest of the simultaneous wages wins.
    LowestWage,
    /// Simultaneous wages are summed up to the cap of the year.
    #[default]
    SumCapped,
}

impl OverlapStrategy {
    pub fn policy(self) -> &'static dyn OverlapPolicy {
        match self {
            OverlapStrategy::LowestWage => &LowestWagePolicy,
            OverlapStrategy::SumCapped => &SumCappedPolicy,
        }
    }
}

impl FromStr for OverlapStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lowest_wage" | "lowest" | "min" => Ok(OverlapStrategy::LowestWage),
            "sum_capped" | "sum" => Ok(OverlapStrategy::SumCapped),
            other => Err(format!("unknown overlap strategy {other:?}")),
        }
    }
}

/// A stretch of one period paid at a single wage.  Half-open.
#[derive(Debug, Clone, PartialEq)]
pub struct WagePiece<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub daily_wage: f64,
    pub employer: &'a str,
    pub registration_id: &'a str,
}

/// The wage a policy settles on for a stretch of days.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWage {
    pub daily_wage: f64,
    pub adjusted_wage: f64,
    pub employer: String,
    pub registration_id: String,
}

/// Decides the wage of days covered by one or more periods.
///
/// Policies must be thread‑safe (`Send + Sync`) because subjects may
/// be analysed concurrently.
pub trait OverlapPolicy: Send + Sync {
    fn strategy(&self) -> OverlapStrategy;

    /// Resolve the wage for the days starting at `from` on which every
    /// piece of `active` applies.  `active` is never empty.
    fn resolve(&self, active: &[&WagePiece<'_>], from: NaiveDate, caps: &WageCapTable) -> ResolvedWage;
}

pub struct LowestWagePolicy;

impl OverlapPolicy for LowestWagePolicy {
    fn strategy(&self) -> OverlapStrategy {
        OverlapStrategy::LowestWage
    }

    fn resolve(&self, active: &[&WagePiece<'_>], from: NaiveDate, caps: &WageCapTable) -> ResolvedWage {
        let lowest = active
            .iter()
            .copied()
            .reduce(|best, piece| if piece.daily_wage < best.daily_wage { piece } else { best });
        match lowest {
            Some(piece) => ResolvedWage {
                daily_wage: piece.daily_wage,
                adjusted_wage: caps.apply(piece.daily_wage, from.year()).0,
                employer: piece.employer.to_string(),
                registration_id: piece.registration_id.to_string(),
            },
            None => ResolvedWage {
                daily_wage: 0.0,
                adjusted_wage: 0.0,
                employer: String::new(),
                registration_id: String::new(),
            },
        }
    }
}

pub struct SumCappedPolicy;

impl OverlapPolicy for SumCappedPolicy {
    fn strategy(&self) -> OverlapStrategy {
        OverlapStrategy::SumCapped
    }

    fn resolve(&self, active: &[&WagePiece<'_>], from: NaiveDate, caps: &WageCapTable) -> ResolvedWage {
        let total: f64 = active.iter().map(|p| p.daily_wage).sum();
        let (adjusted, _) = caps.apply(total, from.year());
        ResolvedWage {
            daily_wage: total,
            adjusted_wage: adjusted,
            employer: join_distinct(active.iter().map(|p| p.employer)),
            registration_id: join_distinct(active.iter().map(|p| p.registration_id)),
        }
    }
}

fn join_distinct<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen.join(" + ")
}

/// The de-duplicated set of contribution days, stored as sorted,
/// disjoint, non-adjacent half-open ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributionDaySet {
    ranges: Vec<(NaiveDate, NaiveDate)>,
}

impl ContributionDaySet {
    /// Merge arbitrary half-open ranges.  Empty ranges are ignored.
    pub fn from_ranges(ranges: impl IntoIterator<Item = (NaiveDate, NaiveDate)>) -> Self {
        let mut sorted: Vec<_> = ranges.into_iter().filter(|(s, e)| s < e).collect();
        sorted.sort_unstable();
        let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::with_capacity(sorted.len());
        for (start, end) in sorted {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        Self { ranges: merged }
    }

    pub fn from_periods(periods: &[LaborPeriod]) -> Self {
        Self::from_ranges(periods.iter().map(|p| (p.start, p.end_exclusive())))
    }

    pub fn ranges(&self) -> &[(NaiveDate, NaiveDate)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn day_count(&self) -> i64 {
        self.ranges.iter().map(|(s, e)| (*e - *s).num_days()).sum()
    }

    /// Complete weeks: `day_count / 7`, never rounded up.
    pub fn weeks(&self) -> i64 {
        self.day_count() / 7
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        let idx = self.ranges.partition_point(|(_, end)| *end <= day);
        self.ranges.get(idx).is_some_and(|(start, _)| *start <= day)
    }

    /// Days of the set inside `[from, to)`.
    pub fn days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        self.ranges
            .iter()
            .map(|(s, e)| {
                let start = (*s).max(from);
                let end = (*e).min(to);
                (end - start).num_days().max(0)
            })
            .sum()
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub days: ContributionDaySet,
    /// Non-overlapping segments, oldest first.
    pub segments: Vec<SalarySegment>,
    pub report: OverlapReport,
}

impl Resolution {
    /// Segments ordered most recent first, as the wage average expects.
    pub fn segments_most_recent_first(&self) -> Vec<SalarySegment> {
        self.segments.iter().rev().cloned().collect()
    }
}

/// Split a period into pieces at its wage changes.
pub fn wage_pieces(period: &LaborPeriod) -> Vec<WagePiece<'_>> {
    let end = period.end_exclusive();
    let mut pieces = Vec::with_capacity(period.wage_changes.len() + 1);
    let mut cursor = period.start;
    let mut wage = period.daily_wage;
    for change in &period.wage_changes {
        if change.date >= end {
            break;
        }
        if change.date > cursor {
            pieces.push(WagePiece {
                start: cursor,
                end: change.date,
                daily_wage: wage,
                employer: &period.employer,
                registration_id: &period.registration_id,
            });
            cursor = change.date;
        }
        wage = change.daily_wage;
    }
    if cursor < end {
        pieces.push(WagePiece {
            start: cursor,
            end,
            daily_wage: wage,
            employer: &period.employer,
            registration_id: &period.registration_id,
        });
    }
    pieces
}

/// January 1 of every year strictly after `first` and up to `last`.
/// Caps are year-indexed, so no segment may straddle a new year.
fn year_starts(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (first.year() + 1..=last.year())
        .filter_map(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .filter(move |day| *day <= last)
}

/// Count period pairs sharing at least one day.
fn overlapping_pairs(periods: &[LaborPeriod]) -> usize {
    let mut spans: Vec<(NaiveDate, NaiveDate)> =
        periods.iter().map(|p| (p.start, p.end_exclusive())).collect();
    spans.sort_unstable();
    let mut pairs = 0;
    for (i, (_, end)) in spans.iter().enumerate() {
        pairs += spans[i + 1..].iter().take_while(|(start, _)| start < end).count();
    }
    pairs
}

/// Merge `periods` into unique days and non-overlapping wage segments.
pub fn resolve(periods: &[LaborPeriod], policy: &dyn OverlapPolicy, caps: &WageCapTable) -> Resolution {
    let days = ContributionDaySet::from_periods(periods);

    let mut pieces: Vec<WagePiece<'_>> = periods.iter().flat_map(wage_pieces).collect();
    pieces.sort_by_key(|p| (p.start, p.end));

    let mut boundaries: Vec<NaiveDate> = pieces.iter().flat_map(|p| [p.start, p.end]).collect();
    if let (Some(&first), Some(&last)) = (boundaries.iter().min(), boundaries.iter().max()) {
        boundaries.extend(year_starts(first, last));
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut segments: Vec<SalarySegment> = Vec::new();
    let mut active: Vec<usize> = Vec::new();
    let mut next_piece = 0;
    for window in boundaries.windows(2) {
        let (from, to) = (window[0], window[1]);
        active.retain(|&i| pieces[i].end > from);
        while next_piece < pieces.len() && pieces[next_piece].start <= from {
            if pieces[next_piece].end > from {
                active.push(next_piece);
            }
            next_piece += 1;
        }
        if active.is_empty() {
            continue;
        }

        let covering: Vec<&WagePiece<'_>> = active.iter().map(|&i| &pieces[i]).collect();
        let resolved = policy.resolve(&covering, from, caps);
        match segments.last_mut() {
            Some(last)
                if last.end == from
                    && last.start.year() == from.year()
                    && last.daily_wage == resolved.daily_wage
                    && last.adjusted_wage == resolved.adjusted_wage
                    && last.employer == resolved.employer
                    && last.registration_id == resolved.registration_id =>
            {
                last.end = to;
            }
            _ => segments.push(SalarySegment {
                start: from,
                end: to,
                daily_wage: resolved.daily_wage,
                adjusted_wage: resolved.adjusted_wage,
                employer: resolved.employer,
                registration_id: resolved.registration_id,
            }),
        }
    }

    let naive_days: i64 = periods.iter().map(LaborPeriod::days).sum();
    let unique_days = days.day_count();
    let report = OverlapReport {
        unique_days,
        unique_weeks: unique_days / 7,
        naive_days,
        overlapping_days: naive_days - unique_days,
        overlapping_pairs: overlapping_pairs(periods),
    };
    tracing::debug!(
        periods = periods.len(),
        segments = segments.len(),
        unique_days,
        overlapping_days = report.overlapping_days,
        strategy = ?policy.strategy(),
        "resolved overlaps"
    );

    Resolution { days, segments, report }
}
