//! Shared domain models.

mod game;
mod item;
mod kind;

pub use game::Game;
pub use item::{value_to_string, Item, ItemId};
pub use kind::{build_item, FieldKind, FormField, ResourceKind};
