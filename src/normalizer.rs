//! Period normalisation.
//!
//! Turns the raw records of the extraction layer into canonical
//! [`LaborPeriod`]s.  Ongoing employments are bounded by the report's
//! issuance date, never by the wall clock, so the same input always
//! produces the same output.  A record that cannot be normalised is
//! skipped and noted; it never aborts the run.

use crate::error::CalcError;
use crate::models::{LaborPeriod, PeriodEnd, RawPeriodRecord, WageChange};
use chrono::NaiveDate;

/// Literal used by the source documents for "still employed".
pub const ONGOING_SENTINEL: &str = "Vigente";

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

/// Parse a document date.  `field` only feeds the error message.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, CalcError> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| CalcError::MalformedDate {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Parse an end date.  `None`, an empty string or the ongoing sentinel
/// yield [`PeriodEnd::Ongoing`].
pub fn parse_end(value: Option<&str>) -> Result<PeriodEnd, CalcError> {
    match value.map(str::trim) {
        None | Some("") => Ok(PeriodEnd::Ongoing),
        Some(text) if text.eq_ignore_ascii_case(ONGOING_SENTINEL) => Ok(PeriodEnd::Ongoing),
        Some(text) => parse_date("end", text).map(PeriodEnd::Closed),
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Accepted periods, sorted by start date.
    pub periods: Vec<LaborPeriod>,
    /// Why each rejected record was skipped.
    pub skipped: Vec<CalcError>,
    pub observations: Vec<String>,
}

/// Normalise one record.  Problems with individual wage changes are
/// pushed to `observations` and the change is dropped; problems with
/// the period itself are returned as errors.
pub fn normalize_period(
    raw: &RawPeriodRecord,
    reference: NaiveDate,
    observations: &mut Vec<String>,
) -> Result<LaborPeriod, CalcError> {
    let start = parse_date("start", &raw.start)?;
    let end = parse_end(raw.end.as_deref())?;
    let resolved_end = match end {
        PeriodEnd::Closed(date) => date,
        PeriodEnd::Ongoing => reference,
    };
    if start > resolved_end {
        return Err(CalcError::InvalidPeriod(match end {
            PeriodEnd::Ongoing => format!("ongoing period starts {start} after the issuance date {reference}"),
            PeriodEnd::Closed(_) => format!("start {start} is after end {resolved_end}"),
        }));
    }
    if !raw.daily_wage.is_finite() || raw.daily_wage < 0.0 {
        return Err(CalcError::InvalidPeriod(format!("daily wage {} is not a valid amount", raw.daily_wage)));
    }

    let mut wage_changes = Vec::with_capacity(raw.wage_changes.len());
    for change in &raw.wage_changes {
        let date = match parse_date("wage change", &change.date) {
            Ok(date) => date,
            Err(err) => {
                observations.push(format!("Ignored a wage change of {}: {err}", raw.employer));
                continue;
            }
        };
        if date < start || date > resolved_end {
            observations.push(format!(
                "Ignored a wage change of {} on {date}: outside the period {start} to {resolved_end}",
                raw.employer
            ));
            continue;
        }
        if !change.daily_wage.is_finite() || change.daily_wage < 0.0 {
            observations.push(format!(
                "Ignored a wage change of {} on {date}: invalid amount {}",
                raw.employer, change.daily_wage
            ));
            continue;
        }
        wage_changes.push(WageChange { date, daily_wage: change.daily_wage });
    }
    wage_changes.sort_by_key(|c| c.date);

    Ok(LaborPeriod {
        employer: raw.employer.trim().to_string(),
        registration_id: raw.registration_id.trim().to_string(),
        start,
        end,
        resolved_end,
        daily_wage: raw.daily_wage,
        wage_changes,
    })
}

/// Normalise every record against the `reference` (issuance) date.
pub fn normalize(records: &[RawPeriodRecord], reference: NaiveDate) -> Normalized {
    let mut out = Normalized::default();

    for raw in records {
        match normalize_period(raw, reference, &mut out.observations) {
            Ok(period) => {
                // Only records equal in every field are duplicates.
                if out.periods.contains(&period) {
                    out.observations.push(format!(
                        "Dropped a duplicate period of {} starting {}",
                        period.employer, period.start
                    ));
                    continue;
                }
                out.periods.push(period);
            }
            Err(err) => {
                tracing::warn!(employer = %raw.employer, start = %raw.start, error = %err, "skipping period");
                out.observations.push(format!(
                    "Skipped the period of {} starting {:?}: {err}",
                    raw.employer, raw.start
                ));
                out.skipped.push(err);
            }
        }
    }

    out.periods.sort_by_key(|p| (p.start, p.resolved_end));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawWageChange;

    fn raw(start: &str, end: Option<&str>, wage: f64) -> RawPeriodRecord {
        RawPeriodRecord {
            employer: "ACME".into(),
            registration_id: "Y123".into(),
            start: start.into(),
            end: end.map(Into::into),
            daily_wage: wage,
            wage_changes: Vec::new(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("x", "09/03/1989").unwrap(), d(1989, 3, 9));
        assert_eq!(parse_date("x", "2025-01-29").unwrap(), d(2025, 1, 29));
        assert_eq!(parse_date("x", " 31-12-2004 ").unwrap(), d(2004, 12, 31));
        assert!(matches!(parse_date("start", "31/02/2004"), Err(CalcError::MalformedDate { .. })));
    }

    #[test]
    fn test_ongoing_sentinel_is_never_a_date() {
        assert_eq!(parse_end(Some("Vigente")).unwrap(), PeriodEnd::Ongoing);
        assert_eq!(parse_end(Some("VIGENTE")).unwrap(), PeriodEnd::Ongoing);
        assert_eq!(parse_end(Some("")).unwrap(), PeriodEnd::Ongoing);
        assert_eq!(parse_end(None).unwrap(), PeriodEnd::Ongoing);
        assert_eq!(parse_end(Some("16/08/1986")).unwrap(), PeriodEnd::Closed(d(1986, 8, 16)));
    }

    #[test]
    fn test_ongoing_capped_at_reference() {
        let reference = d(2025, 1, 29);
        let out = normalize(&[raw("09/03/1989", Some("Vigente"), 925.35)], reference);
        assert_eq!(out.periods.len(), 1);
        let p = &out.periods[0];
        assert!(p.is_ongoing());
        assert_eq!(p.real_end(), None);
        assert_eq!(p.resolved_end, reference);
    }

    #[test]
    fn test_malformed_period_is_skipped_not_fatal() {
        let reference = d(2020, 1, 1);
        let out = normalize(
            &[
                raw("not a date", Some("01/01/2001"), 100.0),
                raw("01/01/2002", Some("31/12/2002"), 100.0),
            ],
            reference,
        );
        assert_eq!(out.periods.len(), 1);
        assert_eq!(out.skipped.len(), 1);
        assert!(matches!(out.skipped[0], CalcError::MalformedDate { ref field, .. } if field == "start"));
        assert_eq!(out.observations.len(), 1);
    }

    #[test]
    fn test_inverted_and_future_periods_rejected() {
        let reference = d(2020, 1, 1);
        let out = normalize(
            &[raw("31/12/2005", Some("01/01/2005"), 100.0), raw("01/06/2021", None, 100.0)],
            reference,
        );
        assert!(out.periods.is_empty());
        assert!(out.skipped.iter().all(|e| matches!(e, CalcError::InvalidPeriod(_))));
    }

    #[test]
    fn test_wage_changes_filtered_and_sorted() {
        let mut record = raw("01/01/2010", Some("31/12/2010"), 100.0);
        record.wage_changes = vec![
            RawWageChange { date: "01/09/2010".into(), daily_wage: 130.0 },
            RawWageChange { date: "01/03/2010".into(), daily_wage: 120.0 },
            RawWageChange { date: "01/03/2011".into(), daily_wage: 999.0 },
            RawWageChange { date: "garbage".into(), daily_wage: 1.0 },
        ];
        let out = normalize(&[record], d(2020, 1, 1));
        let changes = &out.periods[0].wage_changes;
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].date, d(2010, 3, 1));
        assert_eq!(changes[1].daily_wage, 130.0);
        assert_eq!(out.observations.len(), 2);
    }

    #[test]
    fn test_duplicates_dropped() {
        let out = normalize(
            &[raw("01/01/2010", Some("31/12/2010"), 100.0), raw("01/01/2010", Some("31/12/2010"), 100.0)],
            d(2020, 1, 1),
        );
        assert_eq!(out.periods.len(), 1);
        assert!(out.observations[0].contains("duplicate"));
    }

    #[test]
    fn test_distinct_employers_on_same_dates_are_kept() {
        let mut a = raw("01/01/2020", Some("31/12/2020"), 400.0);
        a.employer = "A".into();
        a.registration_id = String::new();
        let mut b = a.clone();
        b.employer = "B".into();
        b.daily_wage = 100.0;
        let mut a_other_wage = a.clone();
        a_other_wage.daily_wage = 250.0;
        let out = normalize(&[a, b, a_other_wage], d(2021, 1, 1));
        assert_eq!(out.periods.len(), 3);
        assert!(out.observations.iter().all(|o| !o.contains("duplicate")));
    }

    #[test]
    fn test_empty_input() {
        let out = normalize(&[], d(2020, 1, 1));
        assert!(out.periods.is_empty());
        assert!(out.skipped.is_empty());
    }
}
