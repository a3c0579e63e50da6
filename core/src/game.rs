//! The game controller: one owner for the board, progression, undo history,
//! furniture and the save store.
//!
//! Every command runs to completion before it returns, and `&mut self`
//! guarantees no second command can start in the middle of one.

use crate::events::GameEvent;
use crate::furniture::{Placement, PurchaseError, Room};
use crate::grid::{Direction, Grid, MoveResult, CELLS};
use crate::history::History;
use crate::idle::IdleTimer;
use crate::progression::{CompanionState, Halt, Progression, RewardGrant, IDLE_SECS_PER_POINT};
use crate::save::{MemoryStore, SaveData, SaveStore};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything a renderer needs after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub grid: [u32; CELLS],
    pub currency: u64,
    pub gauge: u32,
    pub companion: CompanionState,
    pub controls_enabled: bool,
    pub reward_available: bool,
    pub idle_seconds: u64,
    pub idle_bonus: u64,
}

pub struct Game<S: SaveStore = MemoryStore> {
    grid: Grid,
    progression: Progression,
    history: History,
    room: Room,
    idle: IdleTimer,
    rng: SmallRng,
    store: S,
    events: Vec<GameEvent>,
}

impl Game<MemoryStore> {
    /// A game with nothing saved and an in-memory store.
    pub fn in_memory(seed: u64) -> Self {
        Self::new(seed, MemoryStore::new())
    }
}

impl<S: SaveStore> Game<S> {
    /// Start a game, restoring currency and furniture from `store`.
    ///
    /// Unusable saved data falls back to an empty wallet and room.
    pub fn new(seed: u64, store: S) -> Self {
        let saved = store.load().unwrap_or_default();
        info!(
            currency = saved.currency,
            furniture = saved.furniture.len(),
            "loaded progress"
        );
        let mut rng = SmallRng::seed_from_u64(seed);
        Self {
            grid: Grid::new_game(&mut rng),
            progression: Progression::new(saved.currency),
            history: History::new(),
            room: Room::from_placed(saved.furniture),
            idle: IdleTimer::new(),
            rng,
            store,
            events: Vec::new(),
        }
    }

    /// Play one move.
    ///
    /// Returns None when controls are disabled. Otherwise the board state is
    /// pushed for undo (even if the move turns out not to change anything)
    /// and the move result is returned.
    pub fn submit_move(&mut self, direction: Direction) -> Option<MoveResult> {
        if !self.progression.controls_enabled() {
            debug!(?direction, "move ignored while controls are disabled");
            return None;
        }

        self.history.push(self.progression.snapshot(self.grid));
        let result = self.grid.attempt_move(direction);
        if !result.changed {
            return Some(result);
        }

        self.progression.apply_move(&result);
        self.events.extend(
            result
                .merged_values
                .iter()
                .map(|&value| GameEvent::Merged { value }),
        );
        self.grid.spawn_random_tile(&mut self.rng);
        debug!(
            ?direction,
            merges = result.merged_values.len(),
            points = result.points_gained,
            gauge = self.progression.gauge(),
            "move applied"
        );

        match self.progression.settle(&self.grid) {
            Some(Halt::Asleep) => {
                info!("companion fell asleep");
                self.events.push(GameEvent::FellAsleep);
            }
            Some(Halt::Stuck) => {
                info!(max_tile = self.grid.max_tile(), "no moves left");
                self.events.push(GameEvent::Stuck);
            }
            None => {}
        }

        if result.points_gained > 0 {
            self.persist();
        }
        Some(result)
    }

    /// Step back to the board before the latest move.
    ///
    /// Gauge and companion state are restored with the board, and controls
    /// come back on if the restored state is not halted. Currency earned by
    /// the undone move is kept. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(snapshot) => {
                self.grid = snapshot.grid;
                self.progression.restore(&snapshot);
                debug!(remaining = self.history.len(), "undo");
                self.events.push(GameEvent::Undone);
                true
            }
            None => {
                self.events.push(GameEvent::NothingToUndo);
                false
            }
        }
    }

    /// Count idle time toward the reward. The clock stops while the
    /// companion sleeps.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.progression.halt() != Some(Halt::Asleep) {
            self.idle.advance(elapsed);
        }
    }

    /// Claim the wake-up reward using the idle time counted by [`Game::tick`].
    pub fn claim_reward(&mut self) -> Option<RewardGrant> {
        self.claim_reward_with_idle(self.idle.seconds())
    }

    /// Claim the wake-up reward for `idle_secs` of idle time and start a
    /// fresh board. None, with no change, unless play is halted.
    pub fn claim_reward_with_idle(&mut self, idle_secs: u64) -> Option<RewardGrant> {
        let grant = self.progression.claim_reward(idle_secs)?;
        self.grid = Grid::new_game(&mut self.rng);
        self.history.clear();
        self.idle.reset();
        info!(
            base = grant.base,
            idle_bonus = grant.idle_bonus,
            currency = self.progression.currency(),
            "reward claimed"
        );
        self.events.push(GameEvent::RewardGranted(grant));
        self.persist();
        Some(grant)
    }

    /// Buy a furniture item and place it at its default spot.
    pub fn purchase(&mut self, id: &str) -> Result<(), PurchaseError> {
        let item = self.room.check_purchase(id, self.progression.currency())?;
        if !self.progression.try_spend(item.price) {
            return Err(PurchaseError::InsufficientFunds {
                price: item.price,
                available: self.progression.currency(),
            });
        }
        self.room.add(item);
        info!(id, price = item.price, "furniture purchased");
        self.events.push(GameEvent::Purchased { id: id.to_string() });
        self.persist();
        Ok(())
    }

    /// Move an owned furniture item.
    pub fn place_furniture(&mut self, id: &str, placement: Placement) -> Result<(), PurchaseError> {
        self.room.place(id, placement)?;
        self.events.push(GameEvent::Placed { id: id.to_string() });
        self.persist();
        Ok(())
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn view(&self) -> View {
        View {
            grid: *self.grid.cells(),
            currency: self.progression.currency(),
            gauge: self.progression.gauge(),
            companion: self.progression.companion(),
            controls_enabled: self.progression.controls_enabled(),
            reward_available: self.progression.reward_available(),
            idle_seconds: self.idle.seconds(),
            idle_bonus: self.idle_bonus(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn idle_seconds(&self) -> u64 {
        self.idle.seconds()
    }

    /// Bonus the reward would currently add for idle time.
    pub fn idle_bonus(&self) -> u64 {
        self.idle.seconds() / IDLE_SECS_PER_POINT
    }

    fn save_data(&self) -> SaveData {
        SaveData {
            currency: self.progression.currency(),
            furniture: self.room.placed().to_vec(),
        }
    }

    fn persist(&mut self) {
        let data = self.save_data();
        if let Err(err) = self.store.save(&data) {
            warn!(%err, "failed to save progress");
        }
    }
}

impl<S: SaveStore> fmt::Display for Game<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Points: {}   Gauge: {}   Companion: {}",
            self.progression.currency(),
            self.progression.gauge(),
            self.progression.companion()
        )?;
        write!(f, "{}", self.grid)
    }
}

// =============================================================================
// Tests
// =============================================================================
