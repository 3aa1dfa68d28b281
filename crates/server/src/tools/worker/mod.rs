//! Worker lifecycle and client-channel tools.

pub mod client_messages;
pub mod message;
pub mod status;

pub use message::WorkerMessageParams;
