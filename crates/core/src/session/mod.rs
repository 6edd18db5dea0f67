//! Authentication state: the bearer token and where it is persisted.

mod guard;
mod store;

pub use guard::{Authenticator, SessionGuard};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
