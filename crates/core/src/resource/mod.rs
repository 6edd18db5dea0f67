//! REST access, collection views and per-screen controllers.

/// HTTP clients for the catalog API.
pub mod client;
/// Screen-level orchestration of fetch and mutations.
pub mod controller;
/// Local mirror of a collection with search and paging.
pub mod store;

pub use client::{ApiClient, AuthClient, ResourceApi, ResourceClient};
pub use controller::{ControllerHandle, ListController, ListState, Mutation, Notice, NoticeLevel};
pub use store::CollectionStore;
