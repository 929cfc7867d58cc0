//! Application state shared across sessions

mod state;

pub use state::AppState;
