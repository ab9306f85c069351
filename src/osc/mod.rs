//! # OSC output
//!
//! Sends the normalized remote state to an OSC receiver over UDP.
//!
//! ```text
//! osc/
//! ├── config.rs       - Target host/port and defaults
//! └── osc_handler.rs  - UDP sender, connection status and error history
//! ```
//!
//! The sender is synchronous: it is driven from the consumer callback, which
//! runs inside [`crate::controller::Manager::update`].

pub mod config;
pub mod osc_handler;

pub use config::OscConfig;
pub use osc_handler::{ConnectionState, OscError, OscSender, OscStatus};
