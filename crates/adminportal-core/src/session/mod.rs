//! Session state and the store that drives it.

mod state;
mod store;

pub use state::{reduce, Session, SessionAction};
pub use store::SessionStore;
