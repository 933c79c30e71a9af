//! Model → schedule decoding.

use crate::compiler::CourseVars;
use crate::cp::Model;
use crate::error::EngineError;
use crate::models::{Course, Placement, Schedule};

/// Decodes a satisfying valuation into a schedule.
///
/// Placements follow the order of `courses`. A course without a value, or
/// with a value outside `0..term_count`, makes the model malformed.
pub fn extract_schedule(
    model: &Model,
    courses: &[&Course],
    vars: &CourseVars,
    term_count: usize,
) -> Result<Schedule, EngineError> {
    let mut schedule = Schedule::new();

    for course in courses {
        let var = vars.get(&course.id).ok_or_else(|| {
            EngineError::MalformedModel(format!("no variable for course '{}'", course.id))
        })?;
        let value = model.value(var).ok_or_else(|| {
            EngineError::MalformedModel(format!("model has no value for course '{}'", course.id))
        })?;
        let term_index = usize::try_from(value)
            .ok()
            .filter(|&t| t < term_count)
            .ok_or_else(|| {
                EngineError::MalformedModel(format!(
                    "course '{}' assigned to term {} of {}",
                    course.id, value, term_count
                ))
            })?;

        schedule.add_placement(Placement::new(
            course.id.clone(),
            course.code.clone(),
            course.difficulty,
            term_index,
        ));
    }

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::IntVar;
    use crate::models::CourseId;

    fn setup() -> (Vec<Course>, CourseVars) {
        let courses = vec![
            Course::new("c1", "100", "Intro"),
            Course::new("c2", "200", "Advanced"),
        ];
        let vars = courses
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), IntVar::from_index(i)))
            .collect();
        (courses, vars)
    }

    #[test]
    fn test_extract() {
        let (courses, vars) = setup();
        let active: Vec<&Course> = courses.iter().collect();
        let model: Model = [(IntVar::from_index(0), 2), (IntVar::from_index(1), 0)]
            .into_iter()
            .collect();

        let schedule = extract_schedule(&model, &active, &vars, 3).unwrap();
        assert_eq!(schedule.placement_count(), 2);
        assert_eq!(schedule.term_of(&CourseId::new("c1")), Some(2));
        assert_eq!(schedule.by_term().len(), 2);
        assert!(schedule.placements_in(1).is_empty());
    }

    #[test]
    fn test_missing_value() {
        let (courses, vars) = setup();
        let active: Vec<&Course> = courses.iter().collect();
        let model: Model = [(IntVar::from_index(0), 0)].into_iter().collect();
        assert!(matches!(
            extract_schedule(&model, &active, &vars, 3),
            Err(EngineError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_out_of_range_value() {
        let (courses, vars) = setup();
        let active: Vec<&Course> = courses.iter().collect();
        for bad in [-1, 3] {
            let model: Model = [(IntVar::from_index(0), bad), (IntVar::from_index(1), 0)]
                .into_iter()
                .collect();
            assert!(matches!(
                extract_schedule(&model, &active, &vars, 3),
                Err(EngineError::MalformedModel(_))
            ));
        }
    }
}
