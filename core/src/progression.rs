//! Currency, sleepiness gauge and the companion state machine.

use crate::grid::{Grid, MoveResult};
use crate::history::Snapshot;
use std::fmt;

/// Gauge gained by every move that changes the board.
pub const MOVE_GAUGE: u32 = 1;
/// Gauge at which the companion starts looking sleepy.
pub const SLEEPY_THRESHOLD: u32 = 2500;
/// Gauge at which the companion falls asleep and play halts.
pub const SLEEP_THRESHOLD: u32 = 5000;
/// Gauge shown while the companion sleeps.
pub const POST_SLEEP_GAUGE: u32 = 1000;
/// Fixed part of the wake-up reward.
pub const REWARD_BASE: u64 = 100;
/// Idle seconds per bonus point of the wake-up reward.
pub const IDLE_SECS_PER_POINT: u64 = 10;

/// How the companion appears to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompanionState {
    Awake,
    Sleepy,
    Asleep,
    Stuck,
}

impl fmt::Display for CompanionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CompanionState::Awake => "awake",
            CompanionState::Sleepy => "sleepy",
            CompanionState::Asleep => "asleep",
            CompanionState::Stuck => "stuck",
        };
        f.write_str(label)
    }
}

/// Why play has stopped. Either one disables controls and makes the reward
/// claimable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Halt {
    /// The gauge reached the sleep threshold.
    Asleep,
    /// The board has no legal move left.
    Stuck,
}

/// Companion state for a gauge value and an optional halt.
///
/// A halt always wins over the gauge, since the gauge is clamped once the
/// companion falls asleep.
pub fn derive_companion_state(gauge: u32, halt: Option<Halt>) -> CompanionState {
    match halt {
        Some(Halt::Asleep) => CompanionState::Asleep,
        Some(Halt::Stuck) => CompanionState::Stuck,
        None if gauge >= SLEEP_THRESHOLD => CompanionState::Asleep,
        None if gauge >= SLEEPY_THRESHOLD => CompanionState::Sleepy,
        None => CompanionState::Awake,
    }
}

/// Currency granted by a wake-up reward claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardGrant {
    pub base: u64,
    pub idle_bonus: u64,
    pub total: u64,
}

impl RewardGrant {
    pub fn for_idle_seconds(idle_secs: u64) -> Self {
        let idle_bonus = idle_secs / IDLE_SECS_PER_POINT;
        Self {
            base: REWARD_BASE,
            idle_bonus,
            total: REWARD_BASE + idle_bonus,
        }
    }
}

/// Player progression shared by the board, the reward and the shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progression {
    currency: u64,
    gauge: u32,
    halt: Option<Halt>,
    controls_enabled: bool,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Progression {
    pub fn new(currency: u64) -> Self {
        Self {
            currency,
            gauge: 0,
            halt: None,
            controls_enabled: true,
        }
    }

    pub fn currency(&self) -> u64 {
        self.currency
    }

    pub fn gauge(&self) -> u32 {
        self.gauge
    }

    pub fn halt(&self) -> Option<Halt> {
        self.halt
    }

    pub fn companion(&self) -> CompanionState {
        derive_companion_state(self.gauge, self.halt)
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn reward_available(&self) -> bool {
        self.halt.is_some()
    }

    /// Credit the gauge and currency earned by a board-changing move.
    pub fn apply_move(&mut self, result: &MoveResult) {
        debug_assert!(result.changed);
        self.gauge = self
            .gauge
            .saturating_add(MOVE_GAUGE)
            .saturating_add(result.gauge_gained);
        self.currency = self.currency.saturating_add(result.points_gained);
    }

    /// Check the halt conditions after a move, sleep before stuck.
    /// Returns the halt entered by this call, if any.
    pub fn settle(&mut self, grid: &Grid) -> Option<Halt> {
        if self.halt.is_some() {
            return None;
        }
        let halt = if self.gauge >= SLEEP_THRESHOLD {
            self.gauge = POST_SLEEP_GAUGE;
            Halt::Asleep
        } else if !grid.has_any_move() {
            Halt::Stuck
        } else {
            return None;
        };
        self.halt = Some(halt);
        self.controls_enabled = false;
        Some(halt)
    }

    pub fn snapshot(&self, grid: Grid) -> Snapshot {
        Snapshot {
            grid,
            gauge: self.gauge,
            companion: self.companion(),
        }
    }

    /// Roll gauge and companion back to a snapshot. Controls follow the
    /// restored state, so undoing out of a halt re-enables them.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.gauge = snapshot.gauge;
        self.halt = match snapshot.companion {
            CompanionState::Asleep => Some(Halt::Asleep),
            CompanionState::Stuck => Some(Halt::Stuck),
            CompanionState::Awake | CompanionState::Sleepy => None,
        };
        self.controls_enabled = self.halt.is_none();
    }

    /// Grant the wake-up reward and start the companion over.
    /// None when play is not halted.
    pub fn claim_reward(&mut self, idle_secs: u64) -> Option<RewardGrant> {
        self.halt?;
        let grant = RewardGrant::for_idle_seconds(idle_secs);
        self.currency = self.currency.saturating_add(grant.total);
        self.gauge = 0;
        self.halt = None;
        self.controls_enabled = true;
        Some(grant)
    }

    /// Deduct `amount` if affordable.
    pub fn try_spend(&mut self, amount: u64) -> bool {
        if self.currency < amount {
            return false;
        }
        self.currency -= amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge_result(merged: &[u32]) -> MoveResult {
        MoveResult {
            changed: true,
            merged_values: merged.to_vec(),
            points_gained: merged.iter().map(|&v| u64::from(v)).sum(),
            gauge_gained: crate::grid::MERGE_GAUGE * merged.len() as u32,
        }
    }

    fn stuck_grid() -> Grid {
        Grid::from_cells([2, 4, 2, 4, 4, 2, 4, 2, 2, 4, 2, 4, 4, 2, 4, 2]).unwrap()
    }

    fn open_grid() -> Grid {
        Grid::from_cells([2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap()
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(derive_companion_state(0, None), CompanionState::Awake);
        assert_eq!(derive_companion_state(2499, None), CompanionState::Awake);
        assert_eq!(derive_companion_state(2500, None), CompanionState::Sleepy);
        assert_eq!(derive_companion_state(4999, None), CompanionState::Sleepy);
        assert_eq!(derive_companion_state(5000, None), CompanionState::Asleep);
    }

    #[test]
    fn test_halt_overrides_gauge() {
        assert_eq!(
            derive_companion_state(POST_SLEEP_GAUGE, Some(Halt::Asleep)),
            CompanionState::Asleep
        );
        assert_eq!(
            derive_companion_state(3000, Some(Halt::Stuck)),
            CompanionState::Stuck
        );
    }

    #[test]
    fn test_move_credits_base_and_merges() {
        let mut p = Progression::new(10);
        p.apply_move(&merge_result(&[4, 8]));
        assert_eq!(p.gauge(), 1 + 5 + 5);
        assert_eq!(p.currency(), 10 + 12);

        p.apply_move(&merge_result(&[]));
        assert_eq!(p.gauge(), 12);
        assert_eq!(p.currency(), 22);
    }

    #[test]
    fn test_reaching_sleep_threshold_clamps_and_halts() {
        let mut p = Progression::new(0);
        p.gauge = SLEEP_THRESHOLD - 1;
        p.apply_move(&merge_result(&[]));
        assert_eq!(p.settle(&open_grid()), Some(Halt::Asleep));
        assert_eq!(p.gauge(), POST_SLEEP_GAUGE);
        assert_eq!(p.companion(), CompanionState::Asleep);
        assert!(!p.controls_enabled());
        assert!(p.reward_available());
        // Already halted: nothing new.
        assert_eq!(p.settle(&stuck_grid()), None);
    }

    #[test]
    fn test_sleep_takes_precedence_over_stuck() {
        let mut p = Progression::new(0);
        p.gauge = SLEEP_THRESHOLD;
        assert_eq!(p.settle(&stuck_grid()), Some(Halt::Asleep));
    }

    #[test]
    fn test_stuck_board_halts_below_threshold() {
        let mut p = Progression::new(0);
        p.gauge = 3000;
        assert_eq!(p.settle(&stuck_grid()), Some(Halt::Stuck));
        assert_eq!(p.gauge(), 3000);
        assert_eq!(p.companion(), CompanionState::Stuck);
        assert!(!p.controls_enabled());
    }

    #[test]
    fn test_open_board_below_threshold_keeps_playing() {
        let mut p = Progression::new(0);
        p.gauge = 2600;
        assert_eq!(p.settle(&open_grid()), None);
        assert_eq!(p.companion(), CompanionState::Sleepy);
        assert!(p.controls_enabled());
    }

    #[test]
    fn test_reward_requires_a_halt() {
        let mut p = Progression::new(5);
        assert_eq!(p.claim_reward(100), None);
        assert_eq!(p.currency(), 5);
    }

    #[test]
    fn test_reward_adds_idle_bonus_and_wakes() {
        let mut p = Progression::new(5);
        p.gauge = SLEEP_THRESHOLD;
        p.settle(&open_grid());
        let grant = p.claim_reward(37).unwrap();
        assert_eq!(
            grant,
            RewardGrant {
                base: 100,
                idle_bonus: 3,
                total: 103
            }
        );
        assert_eq!(p.currency(), 108);
        assert_eq!(p.gauge(), 0);
        assert_eq!(p.companion(), CompanionState::Awake);
        assert!(p.controls_enabled());
        assert!(!p.reward_available());
    }

    #[test]
    fn test_restore_out_of_halt_reenables_controls() {
        let mut p = Progression::new(0);
        let before = p.snapshot(open_grid());
        p.gauge = SLEEP_THRESHOLD;
        p.settle(&open_grid());
        p.restore(&before);
        assert_eq!(p.gauge(), 0);
        assert_eq!(p.halt(), None);
        assert!(p.controls_enabled());
    }

    #[test]
    fn test_spend_rejects_overdraft() {
        let mut p = Progression::new(300);
        assert!(!p.try_spend(301));
        assert!(p.try_spend(250));
        assert_eq!(p.currency(), 50);
    }
}
