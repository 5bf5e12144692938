//! Redis-backed per-call session state.

pub mod call_session;

pub use call_session::{CallSessionStore, SessionRecord};
