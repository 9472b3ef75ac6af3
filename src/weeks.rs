//! Discounted and reinstated weeks.
//!
//! The institute reports a gross weeks figure, weeks discounted after a
//! withdrawal of retirement resources, and weeks reinstated after the
//! withdrawal was repaid.  A total stated on the document is always
//! authoritative; the recomputed `gross - discounted + reinstated` is
//! kept beside it as a cross-check.
//!
//! Discounts are a legal penalty.  Days removed because two employers
//! reported them at once are an arithmetic correction handled by
//! [`crate::overlap`] and are never folded into the discount figure.

use crate::models::{DiscountImpact, OverlapReport, SubjectInput, TotalSource, WeeksTally};

/// A discounted share above this percentage deserves a review.
pub const REVIEW_THRESHOLD_PCT: f64 = 15.0;

/// Positive discounts up to this many weeks are flagged as possibly
/// misattributed overlap corrections.
pub const NEGLIGIBLE_DISCOUNT_WEEKS: u32 = 4;

/// Stated totals within this many weeks of the computed one are
/// consistent.
pub const TOTAL_TOLERANCE_WEEKS: u32 = 1;

/// The weeks figures as stated on the source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportedWeeks {
    pub gross: Option<u32>,
    pub discounted: Option<u32>,
    pub reinstated: Option<u32>,
    pub total: Option<u32>,
}

impl From<&SubjectInput> for ReportedWeeks {
    fn from(subject: &SubjectInput) -> Self {
        Self {
            gross: subject.gross_weeks,
            discounted: subject.discounted_weeks,
            reinstated: subject.reinstated_weeks,
            total: subject.reported_total_weeks,
        }
    }
}

pub fn classify_discount(discounted: u32, percentage: f64) -> DiscountImpact {
    match percentage {
        _ if discounted == 0 => DiscountImpact::None,
        p if p < 5.0 => DiscountImpact::Minor,
        p if p < 15.0 => DiscountImpact::Moderate,
        p if p < 30.0 => DiscountImpact::Significant,
        _ => DiscountImpact::Severe,
    }
}

/// Build the authoritative weeks tally.
///
/// `overlap` only feeds observations: it is compared with the discount
/// and with the final total but never changes either.
pub fn tally(reported: &ReportedWeeks, overlap: &OverlapReport) -> WeeksTally {
    let discounted = reported.discounted.unwrap_or(0);
    let reinstated = reported.reinstated.unwrap_or(0);
    let mut observations = Vec::new();

    let computed_total = reported.gross.map(|gross| {
        let raw = i64::from(gross) - i64::from(discounted) + i64::from(reinstated);
        if raw < 0 {
            observations.push(format!(
                "Discounted weeks ({discounted}) exceed gross plus reinstated weeks; computed total clamped to 0"
            ));
        }
        u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
    });

    // A stated total of zero is how the extraction layer reports "absent".
    let stated_total = reported.total.filter(|&t| t > 0);
    let (total_weeks, source) = match (stated_total, computed_total) {
        (Some(total), _) => (Some(total), TotalSource::Reported),
        (None, Some(computed)) => {
            observations.push(format!(
                "No total stated on the document; computed {} - {discounted} + {reinstated} = {computed}",
                reported.gross.unwrap_or(0)
            ));
            (Some(computed), TotalSource::Computed)
        }
        (None, None) => {
            observations.push("Neither a total nor a gross weeks figure was reported; total weeks unknown".to_string());
            (None, TotalSource::Unavailable)
        }
    };

    let discrepancy = match (stated_total, computed_total) {
        (Some(total), Some(computed)) if total.abs_diff(computed) > TOTAL_TOLERANCE_WEEKS => {
            tracing::warn!(total, computed, "weeks total discrepancy");
            observations.push(format!(
                "Discrepancy: stated total {total} differs from {} - {discounted} + {reinstated} = {computed} by {} weeks",
                reported.gross.unwrap_or(0),
                total.abs_diff(computed)
            ));
            true
        }
        _ => false,
    };

    let discount_percentage = match reported.gross {
        Some(gross) if gross > 0 => f64::from(discounted) / f64::from(gross) * 100.0,
        _ => 0.0,
    };
    let discount_impact = classify_discount(discounted, discount_percentage);

    if discounted > 0 {
        observations.push(format!(
            "{discounted} weeks discounted, {discount_percentage:.1}% of gross"
        ));
        if discount_percentage > REVIEW_THRESHOLD_PCT {
            observations.push(format!(
                "Discounted share above {REVIEW_THRESHOLD_PCT:.0}%: review the causes with the issuing authority"
            ));
        }

        let overlap_weeks = overlap.overlapping_days / 7;
        if overlap_weeks > 0 && (i64::from(discounted) - overlap_weeks).abs() <= 1 {
            observations.push(format!(
                "Discounted weeks ({discounted}) match the overlap correction ({overlap_weeks} weeks); \
                 confirm they come from a resource withdrawal and not from double-reported days"
            ));
        } else if discounted <= NEGLIGIBLE_DISCOUNT_WEEKS {
            observations.push(format!(
                "Only {discounted} weeks discounted; confirm this is a resource withdrawal rather than an overlap correction"
            ));
        }
    }
    if reinstated > 0 {
        observations.push(format!("{reinstated} weeks reinstated to the recognized total"));
    }

    if let Some(total) = total_weeks {
        if overlap.unique_days > 0 {
            let diff = overlap.unique_weeks - i64::from(total);
            if diff == 0 {
                observations.push("Unique contribution days match the recognized total exactly".to_string());
            } else {
                observations.push(format!(
                    "Unique contribution days give {} weeks, {diff:+} against the recognized total",
                    overlap.unique_weeks
                ));
            }
        }
        observations.push(format!("Total recognized weeks: {total}"));
    }

    WeeksTally {
        gross_weeks: reported.gross,
        discounted_weeks: discounted,
        reinstated_weeks: reinstated,
        total_weeks,
        computed_total,
        source,
        discrepancy,
        discount_percentage,
        discount_impact,
        observations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weeks(gross: Option<u32>, discounted: u32, reinstated: u32, total: Option<u32>) -> ReportedWeeks {
        ReportedWeeks {
            gross,
            discounted: Some(discounted),
            reinstated: Some(reinstated),
            total,
        }
    }

    #[test]
    fn test_stated_total_is_authoritative() {
        let t = tally(&weeks(Some(1000), 100, 20, Some(925)), &OverlapReport::default());
        assert_eq!(t.total_weeks, Some(925));
        assert_eq!(t.computed_total, Some(920));
        assert_eq!(t.source, TotalSource::Reported);
        assert!(t.discrepancy);
        assert!(t.observations.iter().any(|o| o.starts_with("Discrepancy")));
    }

    #[test]
    fn test_within_tolerance_is_consistent() {
        let t = tally(&weeks(Some(1000), 100, 20, Some(921)), &OverlapReport::default());
        assert!(!t.discrepancy);
    }

    #[test]
    fn test_computed_when_no_total() {
        let t = tally(&weeks(Some(1882), 0, 0, None), &OverlapReport::default());
        assert_eq!(t.total_weeks, Some(1882));
        assert_eq!(t.source, TotalSource::Computed);
        assert_eq!(t.discount_impact, DiscountImpact::None);

        let zero_total = tally(&weeks(Some(500), 0, 0, Some(0)), &OverlapReport::default());
        assert_eq!(zero_total.source, TotalSource::Computed);
    }

    #[test]
    fn test_unavailable_total() {
        let t = tally(&ReportedWeeks::default(), &OverlapReport::default());
        assert_eq!(t.total_weeks, None);
        assert_eq!(t.source, TotalSource::Unavailable);
    }

    #[test]
    fn test_never_negative() {
        let t = tally(&weeks(Some(10), 50, 0, None), &OverlapReport::default());
        assert_eq!(t.total_weeks, Some(0));
    }

    #[test]
    fn test_high_discount_observations() {
        let t = tally(&weeks(Some(1000), 200, 0, Some(800)), &OverlapReport::default());
        assert_eq!(t.discount_impact, DiscountImpact::Significant);
        assert!((t.discount_percentage - 20.0).abs() < 1e-9);
        assert!(t.observations.iter().any(|o| o.contains("200 weeks discounted, 20.0% of gross")));
        assert!(t.observations.iter().any(|o| o.contains("issuing authority")));
    }

    #[test]
    fn test_discount_resembling_overlap_is_noted() {
        let overlap = OverlapReport {
            unique_days: 7000,
            unique_weeks: 1000,
            naive_days: 7070,
            overlapping_days: 70,
            overlapping_pairs: 1,
        };
        let t = tally(&weeks(Some(1010), 10, 0, Some(1000)), &overlap);
        assert!(t.observations.iter().any(|o| o.contains("match the overlap correction")));
        assert!(t.observations.iter().any(|o| o.contains("match the recognized total exactly")));
        // the discount figure itself is untouched
        assert_eq!(t.discounted_weeks, 10);
    }

    #[test]
    fn test_negligible_discount_is_noted() {
        let t = tally(&weeks(Some(1000), 2, 0, Some(998)), &OverlapReport::default());
        assert_eq!(t.discount_impact, DiscountImpact::Minor);
        assert!(t.observations.iter().any(|o| o.starts_with("Only 2 weeks discounted")));
    }

    #[test]
    fn test_classification_bands() {
        assert_eq!(classify_discount(0, 0.0), DiscountImpact::None);
        assert_eq!(classify_discount(1, 4.9), DiscountImpact::Minor);
        assert_eq!(classify_discount(1, 10.0), DiscountImpact::Moderate);
        assert_eq!(classify_discount(1, 29.9), DiscountImpact::Significant);
        assert_eq!(classify_discount(1, 45.0), DiscountImpact::Severe);
    }
}
