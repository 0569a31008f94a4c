//! Command-line surface: one optional positional tick budget.
//!
//! A missing, zero, or unparsable budget all mean the run does not wait for
//! ticks. An unparsable value is logged, never fatal.

use milestone_core::runner::TickBudget;
use tracing::warn;

/// Parse the tick budget from the process arguments (program name first).
pub fn budget_from_args<I>(args: I) -> TickBudget
where
    I: IntoIterator<Item = String>,
{
    parse_budget(args.into_iter().nth(1).as_deref())
}

/// Parse a raw tick budget argument.
pub fn parse_budget(raw: Option<&str>) -> TickBudget {
    let Some(raw) = raw else {
        return TickBudget::Immediate;
    };
    match raw.trim().parse::<u64>() {
        Ok(max_ticks) => TickBudget::from_ticks(max_ticks),
        Err(e) => {
            warn!(
                argument = raw,
                error = %e,
                "invalid tick budget, not waiting for ticks"
            );
            TickBudget::Immediate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_argument_is_immediate() {
        assert_eq!(parse_budget(None), TickBudget::Immediate);
        assert_eq!(
            budget_from_args(vec!["milestone-runner".to_owned()]),
            TickBudget::Immediate
        );
    }

    #[test]
    fn numeric_argument_sets_budget() {
        assert_eq!(parse_budget(Some("1500")), TickBudget::Ticks(1500));
        assert_eq!(
            budget_from_args(vec!["milestone-runner".to_owned(), "30".to_owned()]),
            TickBudget::Ticks(30)
        );
    }

    #[test]
    fn zero_is_immediate() {
        assert_eq!(parse_budget(Some("0")), TickBudget::Immediate);
    }

    #[test]
    fn unparsable_falls_back_to_immediate() {
        assert_eq!(parse_budget(Some("lots")), TickBudget::Immediate);
        assert_eq!(parse_budget(Some("-5")), TickBudget::Immediate);
    }
}
