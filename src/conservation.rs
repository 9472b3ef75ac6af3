//! Conservation of rights.
//!
//! After the last contribution, accumulated pension rights stay valid
//! for a period that depends on the recognised weeks and on the legal
//! regime the subject falls under.  The regime is chosen from the date
//! of first registration.  When the subject is still employed on the
//! issuance date, that date stands in for the cessation and the whole
//! result is an estimate.

use crate::error::CalcError;
use crate::models::{ConservationDuration, ConservationResult, LaborPeriod};
use crate::overlap::ContributionDaySet;
use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Lower bound of the Ley 73 conservation period (one year).
pub const LEY73_MIN_WEEKS: u32 = 52;
/// Upper bound for both regimes: 12 years.
pub const MAX_CONSERVATION_WEEKS: u32 = 12 * 52;
pub const REACTIVATION_WEEKS: i64 = 52;
pub const REACTIVATION_LOOKBACK_MONTHS: u32 = 5 * 12;

/// Day the 1997 social security law took effect.
pub fn default_regime_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(1997, 7, 1).unwrap_or_default()
}

/// The statutory framework governing a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    /// 1973 law: first registration before the cutoff.
    #[serde(rename = "ley_73")]
    Ley73,
    /// 1997 law: first registration on or after the cutoff.
    #[serde(rename = "ley_97")]
    Ley97,
}

impl Regime {
    pub fn select(first_registration: NaiveDate, cutoff: NaiveDate) -> Self {
        if first_registration < cutoff {
            Regime::Ley73
        } else {
            Regime::Ley97
        }
    }

    /// Conservation period in weeks for `total_weeks` recognised weeks.
    pub fn conservation_weeks(self, total_weeks: u32) -> u32 {
        match self {
            Regime::Ley73 => ley73_weeks(total_weeks),
            Regime::Ley97 => ley97_weeks(total_weeks),
        }
    }

    /// Lowest value `conservation_weeks` can return.
    pub fn floor_weeks(self) -> u32 {
        match self {
            Regime::Ley73 => LEY73_MIN_WEEKS,
            Regime::Ley97 => 0,
        }
    }

    pub fn criterion(self) -> &'static str {
        match self {
            Regime::Ley73 => "One quarter of the recognised weeks, at least 52 weeks, at most 12 years",
            Regime::Ley97 => "Complete years of recognised weeks, at most 12 years",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Regime::Ley73 => "Ley 73",
            Regime::Ley97 => "Ley 97",
        })
    }
}

/// `max(floor(total / 4), 52)`, capped at 12 years.
fn ley73_weeks(total_weeks: u32) -> u32 {
    (total_weeks / 4).max(LEY73_MIN_WEEKS).min(MAX_CONSERVATION_WEEKS)
}

/// `floor(total / 52) * 52`, capped at 12 years.
fn ley97_weeks(total_weeks: u32) -> u32 {
    ((total_weeks / 52) * 52).min(MAX_CONSERVATION_WEEKS)
}

/// Everything the evaluation reads.
#[derive(Debug, Clone, Copy)]
pub struct ConservationInput<'a> {
    pub total_weeks: Option<u32>,
    pub first_registration: Option<NaiveDate>,
    pub periods: &'a [LaborPeriod],
    pub days: &'a ContributionDaySet,
    /// Issuance date of the report.
    pub reference: NaiveDate,
    pub regime_cutoff: NaiveDate,
}

/// Last cessation date and whether it is hypothetical.
pub fn cessation_date(periods: &[LaborPeriod], reference: NaiveDate) -> Option<(NaiveDate, bool)> {
    if periods.iter().any(LaborPeriod::is_ongoing) {
        return Some((reference, true));
    }
    periods.iter().filter_map(LaborPeriod::real_end).max().map(|date| (date, false))
}

/// At least 52 contribution weeks in the five years up to `cessation`.
pub fn can_reactivate(days: &ContributionDaySet, cessation: NaiveDate) -> bool {
    let from = cessation
        .checked_sub_months(Months::new(REACTIVATION_LOOKBACK_MONTHS))
        .unwrap_or(NaiveDate::MIN);
    let to = cessation.succ_opt().unwrap_or(cessation);
    days.days_between(from, to) / 7 >= REACTIVATION_WEEKS
}

pub fn evaluate(input: &ConservationInput<'_>) -> Result<ConservationResult, CalcError> {
    let total_weeks = input.total_weeks.ok_or(CalcError::MissingTotalWeeks)?;
    let first_registration = input.first_registration.ok_or(CalcError::MissingFirstRegistration)?;
    let mut observations = Vec::new();

    let regime = Regime::select(first_registration, input.regime_cutoff);
    let weeks = regime.conservation_weeks(total_weeks);
    if regime == Regime::Ley73 && total_weeks / 4 < LEY73_MIN_WEEKS {
        observations.push(format!("Minimum conservation of {LEY73_MIN_WEEKS} weeks applied"));
    }
    let uncapped = match regime {
        Regime::Ley73 => total_weeks / 4,
        Regime::Ley97 => (total_weeks / 52) * 52,
    };
    if uncapped > MAX_CONSERVATION_WEEKS {
        observations.push(format!("Conservation capped at 12 years ({MAX_CONSERVATION_WEEKS} weeks)"));
    }

    let (cessation, is_hypothetical) =
        cessation_date(input.periods, input.reference).ok_or(CalcError::MissingCessationDate)?;
    let expiration_date = cessation
        .checked_add_signed(Duration::weeks(i64::from(weeks)))
        .ok_or(CalcError::ExpirationOutOfRange { cessation, weeks })?;
    let days_until_expiration = (expiration_date - input.reference).num_days();

    let (currently_valid, reactivation) = if is_hypothetical {
        tracing::warn!(%cessation, "subject still employed; conservation is an estimate");
        observations.push("ESTIMATE: the subject is still employed at the issuance date".to_string());
        observations.push(
            "The expiration date is an estimate based on the issuance date of the weeks report".to_string(),
        );
        observations.push("Recompute once the subject's employment actually ends".to_string());
        (true, false)
    } else if input.reference <= expiration_date {
        observations.push(format!("Rights valid until {expiration_date}"));
        (true, false)
    } else {
        let reactivate = can_reactivate(input.days, cessation);
        observations.push(format!("Rights expired on {expiration_date}"));
        observations.push(if reactivate {
            format!("At least {REACTIVATION_WEEKS} contribution weeks in the 5 years before cessation: rights can be reactivated")
        } else {
            format!("Fewer than {REACTIVATION_WEEKS} contribution weeks in the 5 years before cessation")
        });
        (false, reactivate)
    };

    let criterion = if is_hypothetical {
        format!("{} (hypothetical cessation, still employed)", regime.criterion())
    } else {
        regime.criterion().to_string()
    };

    tracing::debug!(%regime, total_weeks, weeks, %cessation, %expiration_date, currently_valid, "evaluated conservation");

    Ok(ConservationResult {
        regime,
        first_registration,
        recognized_weeks: total_weeks,
        years_contributed: f64::from(total_weeks) / 52.0,
        duration: ConservationDuration {
            weeks,
            days: i64::from(weeks) * 7,
            years: f64::from(weeks) / 52.0,
        },
        cessation_date: cessation,
        expiration_date,
        currently_valid,
        can_reactivate: reactivation,
        is_hypothetical,
        days_until_expiration,
        criterion,
        observations,
    })
}
