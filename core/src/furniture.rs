//! Furniture catalog and the player's room.

use serde::{Deserialize, Serialize};

/// Position of a furniture sprite in the room, in pixels from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub top: i32,
    pub left: i32,
}

impl Placement {
    pub const fn new(top: i32, left: i32) -> Self {
        Self { top, left }
    }
}

/// A purchasable furniture item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FurnitureItem {
    pub id: &'static str,
    pub name: &'static str,
    pub price: u64,
    pub default_placement: Placement,
}

const fn item(id: &'static str, name: &'static str, price: u64, top: i32, left: i32) -> FurnitureItem {
    FurnitureItem {
        id,
        name,
        price,
        default_placement: Placement::new(top, left),
    }
}

/// Everything the shop sells.
pub const CATALOG: [FurnitureItem; 12] = [
    item("cushion", "Cushion", 250, 120, 50),
    item("table", "Table", 500, 100, 150),
    item("plant", "Potted plant", 400, 20, 220),
    item("futon", "Futon", 300, 150, 100),
    item("lamp", "Lamp", 350, 50, 20),
    item("bookshelf", "Bookshelf", 800, 0, 0),
    item("rug", "Fluffy rug", 600, 180, 80),
    item("curtain", "Blackout curtain", 750, 0, 100),
    item("bedside_table", "Bedside table", 450, 130, 200),
    item("wall_art", "Wall art", 550, 30, 180),
    item("beanbag", "Beanbag", 700, 160, 20),
    item("hammock", "Hammock", 900, 80, 120),
];

/// Look up a catalog entry by id.
pub fn find(id: &str) -> Option<&'static FurnitureItem> {
    CATALOG.iter().find(|item| item.id == id)
}

/// An owned item and where it stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedFurniture {
    pub id: String,
    #[serde(flatten)]
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    #[error("no furniture item named `{0}`")]
    UnknownItem(String),
    #[error("`{0}` is already owned")]
    AlreadyOwned(String),
    #[error("`{0}` is not owned")]
    NotOwned(String),
    #[error("not enough currency: price {price}, available {available}")]
    InsufficientFunds { price: u64, available: u64 },
}

/// Owned furniture in purchase order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Room {
    placed: Vec<PlacedFurniture>,
}

impl Room {
    /// Build a room from saved entries, keeping the first entry per id and
    /// dropping ids the catalog does not know.
    pub fn from_placed(entries: Vec<PlacedFurniture>) -> Self {
        let mut room = Self::default();
        for entry in entries {
            if find(&entry.id).is_some() && !room.owns(&entry.id) {
                room.placed.push(entry);
            }
        }
        room
    }

    pub fn placed(&self) -> &[PlacedFurniture] {
        &self.placed
    }

    pub fn owns(&self, id: &str) -> bool {
        self.placed.iter().any(|p| p.id == id)
    }

    /// Check that `id` can be bought with `available` currency.
    /// Returns the catalog entry on success.
    pub fn check_purchase(
        &self,
        id: &str,
        available: u64,
    ) -> Result<&'static FurnitureItem, PurchaseError> {
        let item = find(id).ok_or_else(|| PurchaseError::UnknownItem(id.to_string()))?;
        if self.owns(id) {
            return Err(PurchaseError::AlreadyOwned(id.to_string()));
        }
        if available < item.price {
            return Err(PurchaseError::InsufficientFunds {
                price: item.price,
                available,
            });
        }
        Ok(item)
    }

    /// Add a bought item at its default position.
    pub(crate) fn add(&mut self, item: &FurnitureItem) {
        self.placed.push(PlacedFurniture {
            id: item.id.to_string(),
            placement: item.default_placement,
        });
    }

    /// Move an owned item.
    pub fn place(&mut self, id: &str, placement: Placement) -> Result<(), PurchaseError> {
        let entry = self
            .placed
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PurchaseError::NotOwned(id.to_string()))?;
        entry.placement = placement;
        Ok(())
    }
}
