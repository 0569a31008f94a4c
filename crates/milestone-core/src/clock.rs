//! Simulation clock and tick gate.
//!
//! The feed can deliver several snapshots for the same tick. The gate
//! records the latest tick seen and tells the run loop whether an incoming
//! tick is new, so milestones are evaluated exactly once per distinct tick.
//!
//! # Design Principles
//!
//! - The recorded tick only moves forward. A snapshot older than the
//!   recorded tick is reported as [`TickStep::Stale`] and leaves the clock
//!   untouched.
//! - Before the first snapshot the clock reads 0, but tick 0 itself still
//!   counts as new when it arrives.

/// How an incoming tick relates to the recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStep {
    /// First snapshot for this tick; the clock moved to it.
    New,
    /// Another snapshot for the tick already recorded.
    Repeat,
    /// A tick older than the recorded one.
    Stale,
}

/// Deduplicates snapshots by tick and holds the simulation clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickGate {
    last_tick: Option<u64>,
}

impl TickGate {
    /// A gate that has not seen any tick yet.
    pub const fn new() -> Self {
        Self { last_tick: None }
    }

    /// Classify `tick` and advance the clock when it is new.
    pub const fn observe(&mut self, tick: u64) -> TickStep {
        match self.last_tick {
            Some(last) if tick == last => TickStep::Repeat,
            Some(last) if tick < last => TickStep::Stale,
            _ => {
                self.last_tick = Some(tick);
                TickStep::New
            }
        }
    }

    /// Whether a snapshot for `tick` should trigger an evaluation pass.
    ///
    /// Returns `true` exactly once per distinct, non-stale tick.
    pub const fn should_process(&mut self, tick: u64) -> bool {
        matches!(self.observe(tick), TickStep::New)
    }

    /// Latest recorded tick, or 0 before the first snapshot.
    pub const fn current_tick(&self) -> u64 {
        match self.last_tick {
            Some(tick) => tick,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let gate = TickGate::new();
        assert_eq!(gate.current_tick(), 0);
        assert_eq!(gate, TickGate::default());
    }

    #[test]
    fn first_tick_zero_is_new() {
        let mut gate = TickGate::new();
        assert!(gate.should_process(0));
        assert!(!gate.should_process(0));
        assert_eq!(gate.current_tick(), 0);
    }

    #[test]
    fn each_distinct_tick_processed_once() {
        let mut gate = TickGate::new();
        assert_eq!(gate.observe(5), TickStep::New);
        assert_eq!(gate.observe(5), TickStep::Repeat);
        assert_eq!(gate.observe(5), TickStep::Repeat);
        assert_eq!(gate.observe(6), TickStep::New);
        assert_eq!(gate.current_tick(), 6);
    }

    #[test]
    fn gaps_are_new_ticks() {
        let mut gate = TickGate::new();
        assert!(gate.should_process(48));
        assert!(gate.should_process(51));
        assert_eq!(gate.current_tick(), 51);
    }

    #[test]
    fn stale_tick_does_not_rewind_clock() {
        let mut gate = TickGate::new();
        let _ = gate.observe(10);
        assert_eq!(gate.observe(7), TickStep::Stale);
        assert_eq!(gate.current_tick(), 10);
        assert!(!gate.should_process(9));
    }
}
