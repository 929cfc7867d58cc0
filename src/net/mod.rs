//! TCP training server: line framing, wire protocol, session handling

pub mod codec;
pub mod handler;
pub mod protocol;
pub mod server;

pub use server::{ServerHandle, SessionRegistry, TrainingServer};
