//! # Mochi 2048 Core Engine
//!
//! A tile-merging puzzle with a sleepy companion. Every move that changes the
//! board makes the companion drowsier; merges earn healing points that buy
//! furniture for the companion's room. When the companion falls asleep, or
//! the board locks up, play halts until the wake-up reward is claimed.
//!
//! Rendering, audio and input live outside this crate. They drive a [`Game`]
//! through directional commands and read back a [`View`] and queued
//! [`GameEvent`]s.
//!
//! ## Example
//!
//! ```rust
//! use mochi_2048_core::{Direction, Game};
//!
//! let mut game = Game::in_memory(42);
//! if let Some(result) = game.submit_move(Direction::Left) {
//!     println!("changed: {}, merges: {:?}", result.changed, result.merged_values);
//! }
//! println!("{}", game.view().companion);
//! ```

pub mod events;
pub mod furniture;
pub mod game;
pub mod grid;
pub mod history;
pub mod idle;
pub mod progression;
pub mod save;

pub use events::GameEvent;
pub use furniture::{FurnitureItem, Placement, PlacedFurniture, PurchaseError, Room, CATALOG};
pub use game::{Game, View};
pub use grid::{Direction, Grid, MoveResult};
pub use history::{History, Snapshot};
pub use progression::{derive_companion_state, CompanionState, Halt, Progression, RewardGrant};
pub use save::{JsonFileStore, MemoryStore, SaveData, SaveError, SaveStore};
