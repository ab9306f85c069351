//! Wii Remote polling with OSC output
//!
//! ```text
//! hardware   - device backends (HID, simulated) and raw remote state
//! controller - polling worker, event decoding, mailbox and manager
//! mapping    - controller events → OSC addresses and arguments
//! osc        - UDP transport for OSC messages
//! config     - settings file, CLI overrides and change watcher
//! ```

pub mod config;
pub mod controller;
pub mod hardware;
pub mod mapping;
pub mod osc;
