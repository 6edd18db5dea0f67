#![warn(clippy::all, missing_docs)]

//! Core logic for the game catalog admin client.
//!
//! This crate hosts the resource models, the REST client, collection
//! filtering and paging, dashboard aggregation and session handling used by
//! the terminal UI and any future frontends.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod resource;
pub mod session;

pub use config::AppConfig;
pub use dashboard::{count_by_year, top_rated, DashboardController, DashboardSummary, YearHistogram};
pub use error::{Action, ApiError, FormError};
pub use models::{Game, Item, ItemId, ResourceKind};
pub use resource::{ApiClient, CollectionStore, ListController, ListState, ResourceApi};
pub use session::{FileTokenStore, SessionGuard, TokenStore};
