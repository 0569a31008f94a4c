//! Run verdict.
//!
//! A run fails when any required milestone's deadline has passed without an
//! on-time success. Non-required milestones never affect the verdict.

use milestone_types::{Milestone, Outcome, Verdict};

/// Required milestones whose deadline is behind `last_tick` and which did
/// not succeed on time.
pub fn failing_required(milestones: &[Milestone], last_tick: u64) -> Vec<&Milestone> {
    milestones
        .iter()
        .filter(|m| {
            m.required && m.deadline_tick < last_tick && m.outcome() != Outcome::Succeeded
        })
        .collect()
}

/// Compute the verdict for the run as of `last_tick`.
pub fn verdict(milestones: &[Milestone], last_tick: u64) -> Verdict {
    let failing = failing_required(milestones, last_tick);
    if failing.is_empty() {
        Verdict::Passed
    } else {
        Verdict::Failed {
            milestones: failing.iter().map(|m| m.description.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use milestone_types::StatusField;

    use super::*;

    fn milestone(description: &str, deadline: u64, required: bool) -> Milestone {
        Milestone::new(
            description,
            BTreeMap::from([(StatusField::Creeps, 1)]),
            deadline,
            required,
        )
    }

    #[test]
    fn nothing_past_deadline_passes() {
        let milestones = vec![milestone("first creep", 50, true)];
        assert_eq!(verdict(&milestones, 0), Verdict::Passed);
        assert_eq!(verdict(&milestones, 50), Verdict::Passed);
    }

    #[test]
    fn unresolved_required_past_deadline_fails() {
        let milestones = vec![milestone("first creep", 50, true)];
        assert_eq!(
            verdict(&milestones, 51),
            Verdict::Failed {
                milestones: vec!["first creep".to_owned()]
            }
        );
    }

    #[test]
    fn too_late_required_fails() {
        let mut late = milestone("first creep", 50, true);
        let _ = late.resolve(60);
        assert!(!verdict(&[late], 100).passed());
    }

    #[test]
    fn on_time_required_passes() {
        let mut on_time = milestone("first creep", 50, true);
        let _ = on_time.resolve(40);
        assert!(verdict(&[on_time], 100).passed());
    }

    #[test]
    fn optional_milestones_never_fail_the_run() {
        let mut late = milestone("three structures", 50, false);
        let _ = late.resolve(90);
        let unresolved = milestone("level 2", 20, false);
        assert!(verdict(&[late, unresolved], 100).passed());
    }

    #[test]
    fn lists_every_failing_milestone() {
        let milestones = vec![
            milestone("a", 10, true),
            milestone("b", 200, true),
            milestone("c", 20, true),
        ];
        let failing: Vec<&str> = failing_required(&milestones, 100)
            .iter()
            .map(|m| m.description.as_str())
            .collect();
        assert_eq!(failing, vec!["a", "c"]);
    }
}
