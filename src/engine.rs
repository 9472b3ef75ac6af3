//! Pension computation engine.
//!
//! The `engine` module turns a [`SubjectInput`] into an
//! [`AnalysisReport`] by running the pipeline
//! normalizer → overlap resolver → {weeks tally, wage average,
//! conservation of rights}.  The three consumers are independent: a
//! failure in one is recorded in the report and never hides the
//! others.  [`analyze_batch`] uses [`rayon`] to spread independent
//! subjects across CPU cores.

use crate::average::weighted_average;
use crate::config::EngineConfig;
use crate::conservation::{self, ConservationInput};
use crate::error::CalcError;
use crate::models::{AnalysisReport, Calculation, CalculationFailure, SubjectInput, TotalSource};
use crate::normalizer::{normalize, parse_date};
use crate::overlap::resolve;
use crate::weeks::{tally, ReportedWeeks};
use rayon::prelude::*;

/// Analyse one subject.
///
/// Only an unparseable issuance date aborts the analysis, since every
/// calculation is anchored on it.  Anything else is reported through
/// `failures` and `observations`.
pub fn analyze(input: &SubjectInput, config: &EngineConfig) -> Result<AnalysisReport, CalcError> {
    let issued_on = parse_date("issued_on", &input.issued_on)?;
    let mut failures = Vec::new();
    let mut observations = Vec::new();

    let normalized = normalize(&input.periods, issued_on);
    failures.extend(normalized.skipped.iter().map(|err| CalculationFailure {
        calculation: Calculation::Normalization,
        error: err.to_string(),
    }));
    observations.extend(normalized.observations.iter().cloned());
    let periods = normalized.periods;

    let strategy = input.overlap_strategy.unwrap_or(config.overlap_strategy);
    let resolution = resolve(&periods, strategy.policy(), &config.wage_caps);

    let weeks = tally(&ReportedWeeks::from(input), &resolution.report);
    if weeks.source == TotalSource::Unavailable {
        failures.push(CalculationFailure {
            calculation: Calculation::WeeksTally,
            error: CalcError::MissingTotalWeeks.to_string(),
        });
    }
    observations.extend(weeks.observations.iter().cloned());

    let average = weighted_average(
        &resolution.segments_most_recent_first(),
        issued_on,
        config.window_days,
        &config.wage_caps,
    );
    observations.extend(average.observations.iter().cloned());

    let first_registration = input
        .first_registration
        .as_deref()
        .map(|raw| parse_date("first_registration", raw))
        .transpose();
    let conservation = first_registration.and_then(|first_registration| {
        conservation::evaluate(&ConservationInput {
            total_weeks: weeks.total_weeks,
            first_registration,
            periods: &periods,
            days: &resolution.days,
            reference: issued_on,
            regime_cutoff: config.regime_cutoff,
        })
    });
    let conservation = match conservation {
        Ok(result) => {
            observations.extend(result.observations.iter().cloned());
            Some(result)
        }
        Err(err) => {
            tracing::warn!(subject = ?input.subject_id, error = %err, "conservation not computed");
            observations.push(format!("Conservation of rights not computed: {err}"));
            if err == CalcError::MissingFirstRegistration {
                if let Some(earliest) = periods.iter().map(|p| p.start).min() {
                    observations.push(format!(
                        "Earliest reported period starts on {earliest}; confirm the first registration date before relying on it"
                    ));
                }
            }
            failures.push(CalculationFailure {
                calculation: Calculation::Conservation,
                error: err.to_string(),
            });
            None
        }
    };

    tracing::debug!(
        subject = ?input.subject_id,
        periods = periods.len(),
        unique_weeks = resolution.report.unique_weeks,
        failures = failures.len(),
        "analysed subject"
    );

    Ok(AnalysisReport {
        subject_id: input.subject_id.clone(),
        issued_on,
        overlap_strategy: strategy,
        periods_received: input.periods.len(),
        periods_used: periods.len(),
        overlap: resolution.report,
        weeks,
        average,
        conservation,
        failures,
        observations,
    })
}

/// Analyse many subjects in parallel.  Results keep the input order.
pub fn analyze_batch(inputs: &[SubjectInput], config: &EngineConfig) -> Vec<Result<AnalysisReport, CalcError>> {
    inputs.par_iter().map(|input| analyze(input, config)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawPeriodRecord;

    fn record(employer: &str, start: &str, end: Option<&str>, wage: f64) -> RawPeriodRecord {
        RawPeriodRecord {
            employer: employer.into(),
            registration_id: format!("{employer}-1"),
            start: start.into(),
            end: end.map(Into::into),
            daily_wage: wage,
            wage_changes: Vec::new(),
        }
    }

    fn subject(periods: Vec<RawPeriodRecord>) -> SubjectInput {
        SubjectInput {
            subject_id: Some("S1".into()),
            issued_on: "2025-01-29".into(),
            first_registration: Some("17/06/1986".into()),
            gross_weeks: Some(1882),
            discounted_weeks: Some(0),
            reinstated_weeks: Some(0),
            reported_total_weeks: Some(1882),
            overlap_strategy: None,
            periods,
        }
    }

    #[test]
    fn test_malformed_issuance_date_is_fatal() {
        let mut input = subject(Vec::new());
        input.issued_on = "yesterday".into();
        assert!(matches!(
            analyze(&input, &EngineConfig::default()),
            Err(CalcError::MalformedDate { ref field, .. }) if field == "issued_on"
        ));
    }

    #[test]
    fn test_conservation_failure_keeps_average() {
        let mut input = subject(vec![record("ACME", "01/01/2020", Some("31/12/2020"), 400.0)]);
        input.gross_weeks = None;
        input.reported_total_weeks = None;
        let report = analyze(&input, &EngineConfig::default()).unwrap();
        assert!(report.conservation.is_none());
        assert_eq!(report.average.total_days, 366);
        assert!(report
            .failures
            .iter()
            .any(|f| f.calculation == Calculation::Conservation && f.error == CalcError::MissingTotalWeeks.to_string()));
        assert!(report.failures.iter().any(|f| f.calculation == Calculation::WeeksTally));
    }

    #[test]
    fn test_malformed_first_registration_fails_conservation_only() {
        let mut input = subject(vec![record("ACME", "01/01/2020", Some("31/12/2020"), 400.0)]);
        input.first_registration = Some("31/31/1999".into());
        let report = analyze(&input, &EngineConfig::default()).unwrap();
        assert!(report.conservation.is_none());
        assert_eq!(report.weeks.total_weeks, Some(1882));
    }

    #[test]
    fn test_missing_first_registration_is_not_defaulted() {
        let mut input = subject(vec![record("ACME", "01/01/2001", Some("31/12/2010"), 400.0)]);
        input.first_registration = None;
        let report = analyze(&input, &EngineConfig::default()).unwrap();
        assert!(report.conservation.is_none());
        assert!(report.failures.iter().any(|f| f.calculation == Calculation::Conservation
            && f.error == CalcError::MissingFirstRegistration.to_string()));
        assert!(report.observations.iter().any(|o| o.starts_with("Earliest reported period starts on 2001-01-01")));
        assert_eq!(report.average.total_days, 1750);
    }

    #[test]
    fn test_skipped_period_recorded() {
        let input = subject(vec![
            record("BAD", "99/99/9999", None, 100.0),
            record("ACME", "01/01/2020", None, 400.0),
        ]);
        let report = analyze(&input, &EngineConfig::default()).unwrap();
        assert_eq!(report.periods_received, 2);
        assert_eq!(report.periods_used, 1);
        assert_eq!(report.failures[0].calculation, Calculation::Normalization);
        let conservation = report.conservation.unwrap();
        assert!(conservation.is_hypothetical);
        assert!(conservation.currently_valid);
    }

    #[test]
    fn test_strategy_override_per_subject() {
        let mut input = subject(vec![
            record("A", "01/01/2020", Some("31/12/2020"), 400.0),
            record("B", "01/01/2020", Some("31/12/2020"), 100.0),
        ]);
        input.overlap_strategy = Some(crate::overlap::OverlapStrategy::LowestWage);
        let report = analyze(&input, &EngineConfig::default()).unwrap();
        assert_eq!(report.average.average_daily_wage, 100.0);

        input.overlap_strategy = None;
        let report = analyze(&input, &EngineConfig::default()).unwrap();
        assert_eq!(report.average.average_daily_wage, 500.0);
    }

    #[test]
    fn test_employers_without_registration_id_both_count() {
        let mut a = record("A", "01/01/2020", Some("31/12/2020"), 400.0);
        a.registration_id = String::new();
        let mut b = record("B", "01/01/2020", Some("31/12/2020"), 100.0);
        b.registration_id = String::new();
        let report = analyze(&subject(vec![a, b]), &EngineConfig::default()).unwrap();
        assert_eq!(report.periods_used, 2);
        assert_eq!(report.overlap.overlapping_days, 366);
        assert_eq!(report.average.average_daily_wage, 500.0);
    }

    #[test]
    fn test_batch_keeps_order() {
        let mut bad = subject(Vec::new());
        bad.issued_on = "nope".into();
        let mut second = subject(Vec::new());
        second.subject_id = Some("S2".into());
        let results = analyze_batch(&[subject(Vec::new()), bad, second], &EngineConfig::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().subject_id.as_deref(), Some("S1"));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().subject_id.as_deref(), Some("S2"));
    }
}
