//! Constraint families.
//!
//! Each function turns part of a catalog snapshot into [`BoolExpr`]
//! constraints over the term-index variables of active courses. The
//! families are independent; their conjunction is the feasible region.

use crate::cp::{BoolExpr, IntExpr, IntVar};
use crate::models::{Course, Difficulty, Term};

use super::CourseVars;

/// Smallest difficulty among the given courses.
pub fn min_active_difficulty(courses: &[&Course]) -> Option<Difficulty> {
    courses.iter().map(|c| c.difficulty).min()
}

/// Indices of terms that may hold any course at all.
///
/// A term whose cap is below `min_difficulty` can never hold a course and
/// is excluded. With `min_difficulty == None` every term is a candidate.
pub fn candidate_terms(terms: &[Term], min_difficulty: Option<Difficulty>) -> Vec<usize> {
    terms
        .iter()
        .enumerate()
        .filter(|(_, t)| min_difficulty.map_or(true, |d| t.max_difficulty >= d))
        .map(|(i, _)| i)
        .collect()
}

/// `var` takes the index of a candidate term whose part the course is
/// offered in.
///
/// Without such a term the disjunction is empty, which no valuation
/// satisfies.
pub fn term_membership(
    course: &Course,
    var: IntVar,
    terms: &[Term],
    candidates: &[usize],
) -> BoolExpr {
    BoolExpr::or(
        candidates
            .iter()
            .filter(|&&i| course.is_available_in(terms[i].part))
            .map(|&i| IntExpr::var(var).equals(i as i64)),
    )
}

/// `term(course) > term(dependency)` for every dependency that has a
/// variable. Dependencies on inactive or unknown courses yield nothing.
pub fn dependency_ordering(course: &Course, var: IntVar, vars: &CourseVars) -> Vec<BoolExpr> {
    course
        .dependencies
        .iter()
        .filter_map(|dep| vars.get(dep))
        .map(|dep_var| IntExpr::var(var).gt(dep_var))
        .collect()
}

/// Summed difficulty of the courses placed in `term_index` is at most the
/// term's cap.
pub fn difficulty_cap(
    term_index: usize,
    term: &Term,
    courses: &[&Course],
    vars: &CourseVars,
) -> BoolExpr {
    let load = IntExpr::sum(courses.iter().filter_map(|course| {
        let var = vars.get(&course.id)?;
        Some(IntExpr::ite(
            IntExpr::var(var).equals(term_index as i64),
            i64::from(course.difficulty),
            0i64,
        ))
    }));
    load.le(i64::from(term.max_difficulty))
}

/// At most `max_courses` variables take the value `term_index`.
pub fn course_count_cap(term_index: usize, max_courses: usize, vars: &CourseVars) -> BoolExpr {
    BoolExpr::at_most(
        max_courses,
        vars.iter()
            .map(|(_, var)| IntExpr::var(var).equals(term_index as i64)),
    )
}

/// The terms up to `makespan` offer at least `demand` capacity in total.
///
/// `capacities[t]` is what term `t` can hold. Every course sits in a
/// capacity-bounded term no later than the makespan, so this is implied by
/// term membership plus a cap family. Asserting it lets an engine rule out
/// a too-small makespan without enumerating placements.
pub fn makespan_capacity_bound(makespan: &IntExpr, capacities: &[i64], demand: i64) -> BoolExpr {
    let supply = IntExpr::sum(capacities.iter().enumerate().map(|(t, &capacity)| {
        IntExpr::ite(
            IntExpr::constant(t as i64).le(makespan.clone()),
            capacity,
            0i64,
        )
    }));
    IntExpr::constant(demand).le(supply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::Model;
    use crate::models::{terms, CourseId, TermPart};

    fn setup() -> (Vec<Course>, Vec<Term>) {
        let courses = vec![
            Course::new("c1", "100", "Intro")
                .with_difficulty(6)
                .with_available_parts([TermPart::A]),
            Course::new("c2", "200", "Advanced")
                .with_difficulty(4)
                .with_dependency("c1"),
            Course::new("c3", "300", "Elective")
                .with_difficulty(4)
                .with_dependency("off"),
        ];
        let terms = terms::consecutive(Term::new(2027, TermPart::A), 4);
        (courses, terms)
    }

    fn vars_for(courses: &[Course]) -> CourseVars {
        courses
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), IntVar::from_index(i)))
            .collect()
    }

    #[test]
    fn test_candidate_terms_prefilter() {
        let terms = vec![
            Term::new(2027, TermPart::A).with_max_difficulty(3),
            Term::new(2027, TermPart::B),
            Term::new(2027, TermPart::C).with_max_difficulty(4),
        ];
        assert_eq!(candidate_terms(&terms, Some(4)), vec![1, 2]);
        assert_eq!(candidate_terms(&terms, None), vec![0, 1, 2]);
    }

    #[test]
    fn test_term_membership() {
        let (courses, terms) = setup();
        let var = IntVar::from_index(0);
        let expr = term_membership(&courses[0], var, &terms, &[0, 1, 2, 3]);
        // Part A terms only: index 0 (2027A) and 3 (2028A)
        match &expr {
            BoolExpr::Or(clauses) => assert_eq!(clauses.len(), 2),
            other => panic!("expected Or, got {other:?}"),
        }
        let at = |t: i64| -> Model { [(var, t)].into_iter().collect() };
        assert_eq!(expr.eval(&at(0)), Some(true));
        assert_eq!(expr.eval(&at(1)), Some(false));
        assert_eq!(expr.eval(&at(3)), Some(true));
    }

    #[test]
    fn test_term_membership_empty_is_false() {
        let (courses, terms) = setup();
        let expr = term_membership(&courses[0], IntVar::from_index(0), &terms, &[1, 2]);
        assert_eq!(expr, BoolExpr::Or(vec![]));
        assert_eq!(expr.eval(&Model::new()), Some(false));
    }

    #[test]
    fn test_dependency_ordering_skips_missing() {
        let (courses, _) = setup();
        let vars = vars_for(&courses);
        let c2 = dependency_ordering(&courses[1], IntVar::from_index(1), &vars);
        assert_eq!(c2.len(), 1);
        let c3 = dependency_ordering(&courses[2], IntVar::from_index(2), &vars);
        assert!(c3.is_empty());
    }

    #[test]
    fn test_difficulty_cap() {
        let (courses, terms) = setup();
        let vars = vars_for(&courses);
        let active: Vec<&Course> = courses.iter().collect();
        let cap = difficulty_cap(0, &terms[0], &active, &vars);

        let model = |a: i64, b: i64, c: i64| -> Model {
            [
                (IntVar::from_index(0), a),
                (IntVar::from_index(1), b),
                (IntVar::from_index(2), c),
            ]
            .into_iter()
            .collect()
        };
        assert_eq!(cap.eval(&model(0, 0, 1)), Some(true)); // 6 + 4
        assert_eq!(cap.eval(&model(0, 0, 0)), Some(false)); // 6 + 4 + 4
        assert_eq!(cap.eval(&model(1, 1, 1)), Some(true));
    }

    #[test]
    fn test_course_count_cap() {
        let (courses, _) = setup();
        let vars = vars_for(&courses);
        let cap = course_count_cap(2, 1, &vars);
        let model: Model = [
            (IntVar::from_index(0), 2),
            (IntVar::from_index(1), 2),
            (IntVar::from_index(2), 0),
        ]
        .into_iter()
        .collect();
        assert_eq!(cap.eval(&model), Some(false));
        assert!(vars.get(&CourseId::new("c1")).is_some());
    }

    #[test]
    fn test_makespan_capacity_bound() {
        let m = IntVar::from_index(0);
        let bound = makespan_capacity_bound(&IntExpr::var(m), &[10, 10, 0, 10], 25);
        let at = |t: i64| -> Model { [(m, t)].into_iter().collect() };
        assert_eq!(bound.eval(&at(0)), Some(false));
        assert_eq!(bound.eval(&at(2)), Some(false)); // 10 + 10 + 0
        assert_eq!(bound.eval(&at(3)), Some(true));
    }

    #[test]
    fn test_min_active_difficulty() {
        let (courses, _) = setup();
        let active: Vec<&Course> = courses.iter().collect();
        assert_eq!(min_active_difficulty(&active), Some(4));
        assert_eq!(min_active_difficulty(&[]), None);
    }
}
