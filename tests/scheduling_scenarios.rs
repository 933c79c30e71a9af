// End-to-end scheduling scenarios over the default engine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use u_curriculum::compiler::ConstraintFamily;
use u_curriculum::config::{CapacityPolicy, SolverConfig};
use u_curriculum::cp::BranchAndBoundEngine;
use u_curriculum::kpi::PlanKpi;
use u_curriculum::models::defaults::{default_courses, default_terms};
use u_curriculum::models::{
    terms, Course, CourseId, Placement, Schedule, SchedulingOutcome, Term, TermPart,
};
use u_curriculum::solver::ScheduleSolver;
use u_curriculum::validation::{
    validate_schedule, validate_schedule_with, would_create_cycle, ValidationErrorKind,
};

fn course(id: &str, difficulty: u32) -> Course {
    Course::new(id, id, format!("Course {id}")).with_difficulty(difficulty)
}

fn solve(courses: &[Course], terms: &[Term]) -> SchedulingOutcome {
    u_curriculum::logging::init_test();
    ScheduleSolver::default().solve(courses, terms).unwrap()
}

#[test]
fn test_single_course_single_term() {
    let courses = vec![course("c1", 6).with_available_parts([TermPart::A])];
    let terms = vec![Term::new(2027, TermPart::A).with_max_difficulty(10)];

    let outcome = solve(&courses, &terms);
    let schedule = outcome.schedule().unwrap();
    assert_eq!(schedule.term_of(&CourseId::new("c1")), Some(0));
    assert_eq!(schedule.by_term().len(), 1);
}

#[test]
fn test_dependency_needs_two_terms() {
    let courses = vec![course("c1", 1), course("c2", 1).with_dependency("c1")];
    let terms = vec![Term::new(2027, TermPart::A)];
    assert_eq!(solve(&courses, &terms), SchedulingOutcome::Unsatisfiable);
}

#[test]
fn test_unavailable_part_is_unsat() {
    let courses = vec![course("c1", 3).with_available_parts([TermPart::B])];
    let terms = vec![Term::new(2027, TermPart::A), Term::new(2028, TermPart::A)];
    assert_eq!(solve(&courses, &terms), SchedulingOutcome::Unsatisfiable);

    let diagnoses = ScheduleSolver::default().diagnose(&courses, &terms).unwrap();
    let membership = diagnoses
        .iter()
        .find(|d| d.family == ConstraintFamily::TermMembership)
        .unwrap();
    assert!(membership.restores_feasibility);
}

#[test]
fn test_empty_catalog() {
    let outcome = solve(&[], &terms::consecutive(Term::new(2027, TermPart::A), 3));
    let schedule = outcome.into_schedule().unwrap();
    assert!(schedule.is_empty());
    assert!(schedule.by_term().is_empty());
}

#[test]
fn test_inactive_dependency_adds_no_ordering() {
    let courses = vec![
        course("c1", 3).with_active(false),
        course("c2", 3).with_dependency("c1"),
        course("c3", 3).with_dependency("c2").with_active(false),
    ];
    let terms = vec![Term::new(2027, TermPart::A)];

    let schedule = solve(&courses, &terms).into_schedule().unwrap();
    assert_eq!(schedule.placement_count(), 1);
    assert_eq!(schedule.term_of(&CourseId::new("c2")), Some(0));
}

#[test]
fn test_cycle_is_refused() {
    let courses = vec![
        course("c1", 2).with_dependency("c3"),
        course("c2", 2).with_dependency("c1"),
        course("c3", 2).with_dependency("c2"),
    ];
    let terms = terms::consecutive(Term::new(2027, TermPart::A), 5);

    let err = ScheduleSolver::default().solve(&courses, &terms).unwrap_err();
    assert!(err
        .validation_errors()
        .unwrap()
        .iter()
        .any(|e| e.kind == ValidationErrorKind::CyclicDependency));

    // Every edge of the cycle is flagged by the editor guard.
    for c in &courses {
        for dep in &c.dependencies {
            assert!(would_create_cycle(&courses, &c.id, dep));
        }
    }
}

#[test]
fn test_more_terms_keep_feasibility() {
    let courses = vec![
        course("c1", 6),
        course("c2", 6).with_dependency("c1"),
        course("c3", 5).with_available_parts([TermPart::C]),
    ];
    let mut terms = terms::consecutive(Term::new(2027, TermPart::A), 3);
    assert!(solve(&courses, &terms).is_satisfiable());

    terms.extend(terms::consecutive(terms[2].next(), 3));
    assert!(solve(&courses, &terms).is_satisfiable());

    // Only term C offers c3.
    let without_c: Vec<Term> = terms
        .iter()
        .filter(|t| t.part != TermPart::C)
        .cloned()
        .collect();
    assert!(!solve(&courses, &without_c).is_satisfiable());
}

#[test]
fn test_default_catalog() {
    let courses = default_courses();
    let terms = default_terms(2027);

    let schedule = solve(&courses, &terms).into_schedule().unwrap();
    assert_eq!(schedule.placement_count(), courses.len());
    assert!(validate_schedule(&schedule, &courses, &terms).is_empty());
    // Ten terms (indices 0..=9) is the proven optimum for this catalog.
    assert_eq!(schedule.makespan(), Some(9));

    let kpi = PlanKpi::calculate(&schedule, &terms);
    assert_eq!(kpi.terms_spanned, 10);
    assert!(kpi.peak_load <= 10);
}

// ----------------------------------------------------------------------
// Catalogs of realistic size
// ----------------------------------------------------------------------

fn interchangeable(count: usize, difficulty: u32) -> Vec<Course> {
    (0..count)
        .map(|i| course(&format!("c{i}"), difficulty))
        .collect()
}

#[test]
fn test_thirty_interchangeable_courses() {
    // Two courses per term fill exactly fifteen terms.
    let courses = interchangeable(30, 5);
    let terms = terms::consecutive(Term::new(2027, TermPart::A), 15);

    let schedule = solve(&courses, &terms).into_schedule().unwrap();
    assert_eq!(schedule.placement_count(), 30);
    assert_eq!(schedule.makespan(), Some(14));
    assert!(validate_schedule(&schedule, &courses, &terms).is_empty());
}

#[test]
fn test_thirty_courses_in_prerequisite_tracks() {
    // Five tracks of six levels, each level requiring the previous one.
    let mut courses = Vec::new();
    for track in 0..5 {
        for level in 0..6 {
            let mut c = course(&format!("t{track}l{level}"), 5);
            if level > 0 {
                c = c.with_dependency(format!("t{track}l{}", level - 1));
            }
            courses.push(c);
        }
    }
    let terms = terms::consecutive(Term::new(2027, TermPart::A), 18);

    let schedule = solve(&courses, &terms).into_schedule().unwrap();
    assert_eq!(schedule.placement_count(), 30);
    assert_eq!(schedule.makespan(), Some(14));
    assert!(validate_schedule(&schedule, &courses, &terms).is_empty());
}

#[test]
fn test_bundled_engine_on_full_terms() {
    // One course fills a term; the optimum uses every term.
    let courses = interchangeable(12, 10);
    let terms = terms::consecutive(Term::new(2027, TermPart::A), 12);

    let outcome = ScheduleSolver::new(BranchAndBoundEngine::new())
        .solve(&courses, &terms)
        .unwrap();
    let schedule = outcome.into_schedule().unwrap();
    assert_eq!(schedule.makespan(), Some(11));
    assert!(validate_schedule(&schedule, &courses, &terms).is_empty());
}

// ----------------------------------------------------------------------
// Randomized legality and minimality against exhaustive enumeration
// ----------------------------------------------------------------------

fn random_instance(rng: &mut StdRng) -> (Vec<Course>, Vec<Term>) {
    let n = rng.random_range(1..=4);
    let mut courses = Vec::with_capacity(n);
    for i in 0..n {
        let parts: Vec<TermPart> = TermPart::ALL
            .into_iter()
            .filter(|_| rng.random_bool(0.6))
            .collect();
        let parts = if parts.is_empty() {
            vec![TermPart::A]
        } else {
            parts
        };
        let mut c = course(&format!("c{i}"), rng.random_range(1..=6))
            .with_available_parts(parts)
            .with_active(rng.random_bool(0.85));
        // Edges only point to earlier courses, so the graph stays acyclic.
        for j in 0..i {
            if rng.random_bool(0.3) {
                c = c.with_dependency(format!("c{j}"));
            }
        }
        courses.push(c);
    }

    let count = rng.random_range(1..=4);
    let first = Term::new(2027, TermPart::ALL[rng.random_range(0..3)]);
    let terms = terms::consecutive(first, count)
        .into_iter()
        .map(|t| {
            let cap = rng.random_range(2..=10);
            t.with_max_difficulty(cap)
        })
        .collect();
    (courses, terms)
}

/// Smallest legal makespan by enumerating every assignment.
fn brute_force(courses: &[Course], terms: &[Term], policy: &CapacityPolicy) -> Option<usize> {
    let active: Vec<&Course> = courses.iter().filter(|c| c.active).collect();
    let total = terms.len().pow(active.len() as u32);
    let mut best: Option<usize> = None;

    for code in 0..total {
        let mut rest = code;
        let mut schedule = Schedule::new();
        for c in &active {
            let t = rest % terms.len();
            rest /= terms.len();
            schedule.add_placement(Placement::new(c.id.clone(), c.code.clone(), c.difficulty, t));
        }
        if validate_schedule_with(&schedule, courses, terms, policy).is_empty() {
            let makespan = schedule.makespan().unwrap_or(0);
            best = Some(best.map_or(makespan, |b| b.min(makespan)));
        }
    }
    best
}

fn check_against_brute_force(seed: u64, config: SolverConfig) {
    let mut rng = StdRng::seed_from_u64(seed);
    let solver = ScheduleSolver::from_config(config.clone());

    for _ in 0..150 {
        let (courses, terms) = random_instance(&mut rng);
        let expected = brute_force(&courses, &terms, &config.capacity_policy);
        let outcome = solver.solve(&courses, &terms).unwrap();

        match (outcome, expected) {
            (SchedulingOutcome::Unsatisfiable, None) => {}
            (SchedulingOutcome::Satisfiable(schedule), Some(best)) => {
                let violations =
                    validate_schedule_with(&schedule, &courses, &terms, &config.capacity_policy);
                assert!(violations.is_empty(), "{violations:?}");
                if courses.iter().any(|c| c.active) {
                    assert_eq!(schedule.makespan(), Some(best), "{courses:?} {terms:?}");
                }
            }
            (outcome, expected) => {
                panic!("solver {outcome:?} vs exhaustive {expected:?} on {courses:?} {terms:?}")
            }
        }
    }
}

#[test]
fn test_random_instances_difficulty_cap() {
    check_against_brute_force(7, SolverConfig::default());
}

#[test]
fn test_random_instances_without_prefilter() {
    check_against_brute_force(11, SolverConfig::default().with_prune_small_terms(false));
}

#[test]
fn test_random_instances_course_count() {
    let config = SolverConfig::default()
        .with_capacity_policy(CapacityPolicy::DifficultyAndCourseCount { max_courses: 2 });
    check_against_brute_force(23, config);
}
