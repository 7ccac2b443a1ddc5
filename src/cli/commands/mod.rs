//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod ingest;
mod serve;
mod sessions;

pub use ask::run_ask;
pub use chat::{run_chat, ChatOptions};
pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use serve::run_serve;
pub use sessions::run_sessions;
