//! Plan quality metrics.
//!
//! Computes indicators of a solved curriculum plan against its term
//! sequence.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Terms spanned | Makespan + 1 (0 for an empty plan) |
//! | Peak load | Largest summed difficulty in one term |
//! | Load by term | Summed difficulty per term index |
//! | Utilization by term | Load / cap per term index |
//! | Avg Utilization | Mean utilization over spanned terms |
//! | Idle terms | Spanned terms holding no course |

use crate::models::{Difficulty, Schedule, Term};

/// Curriculum plan indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanKpi {
    /// Number of terms from the first up to the last used one.
    pub terms_spanned: usize,
    /// Number of placed courses.
    pub course_count: usize,
    /// Largest term load.
    pub peak_load: Difficulty,
    /// Load per term index (one entry per term).
    pub load_by_term: Vec<Difficulty>,
    /// Load / cap per term index (0.0 for a zero cap).
    pub utilization_by_term: Vec<f64>,
    /// Mean utilization over the spanned terms (0.0..1.0).
    pub avg_utilization: f64,
    /// Spanned terms without any course.
    pub idle_terms: usize,
}

impl PlanKpi {
    /// Computes indicators from a schedule and its term sequence.
    ///
    /// Placements pointing past the end of `terms` are ignored.
    pub fn calculate(schedule: &Schedule, terms: &[Term]) -> Self {
        let load_by_term: Vec<Difficulty> =
            (0..terms.len()).map(|t| schedule.term_load(t)).collect();

        let utilization_by_term: Vec<f64> = terms
            .iter()
            .zip(&load_by_term)
            .map(|(term, &load)| {
                if term.max_difficulty == 0 {
                    0.0
                } else {
                    f64::from(load) / f64::from(term.max_difficulty)
                }
            })
            .collect();

        let terms_spanned = schedule
            .makespan()
            .map_or(0, |m| (m + 1).min(terms.len()));

        let avg_utilization = if terms_spanned == 0 {
            0.0
        } else {
            let sum: f64 = utilization_by_term[..terms_spanned].iter().sum();
            sum / terms_spanned as f64
        };

        let idle_terms = load_by_term[..terms_spanned]
            .iter()
            .filter(|&&load| load == 0)
            .count();

        Self {
            terms_spanned,
            course_count: schedule.placement_count(),
            peak_load: load_by_term.iter().copied().max().unwrap_or(0),
            load_by_term,
            utilization_by_term,
            avg_utilization,
            idle_terms,
        }
    }

    /// Whether the plan finishes within `max_terms` and is at least
    /// `min_utilization` busy on average.
    pub fn meets_thresholds(&self, max_terms: usize, min_utilization: f64) -> bool {
        self.terms_spanned <= max_terms && self.avg_utilization >= min_utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{terms, Placement, TermPart};

    fn four_terms() -> Vec<Term> {
        terms::consecutive(Term::new(2027, TermPart::A), 4)
    }

    #[test]
    fn test_kpi_basic() {
        let mut schedule = Schedule::new();
        schedule.add_placement(Placement::new("c1", "100", 6, 0));
        schedule.add_placement(Placement::new("c2", "200", 4, 0));
        schedule.add_placement(Placement::new("c3", "300", 5, 2));

        let kpi = PlanKpi::calculate(&schedule, &four_terms());
        assert_eq!(kpi.terms_spanned, 3);
        assert_eq!(kpi.course_count, 3);
        assert_eq!(kpi.peak_load, 10);
        assert_eq!(kpi.load_by_term, vec![10, 0, 5, 0]);
        assert_eq!(kpi.idle_terms, 1);
        // (1.0 + 0.0 + 0.5) / 3
        assert!((kpi.avg_utilization - 0.5).abs() < 1e-10);
        assert!(kpi.meets_thresholds(3, 0.5));
        assert!(!kpi.meets_thresholds(2, 0.0));
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = PlanKpi::calculate(&Schedule::new(), &four_terms());
        assert_eq!(kpi.terms_spanned, 0);
        assert_eq!(kpi.peak_load, 0);
        assert_eq!(kpi.avg_utilization, 0.0);
        assert_eq!(kpi.idle_terms, 0);
    }

    #[test]
    fn test_kpi_zero_cap() {
        let terms = vec![Term::new(2027, TermPart::A).with_max_difficulty(0)];
        let mut schedule = Schedule::new();
        schedule.add_placement(Placement::new("c1", "100", 1, 0));
        let kpi = PlanKpi::calculate(&schedule, &terms);
        assert_eq!(kpi.utilization_by_term, vec![0.0]);
    }
}
