//! Controller subsystem: from raw remote state to consumer callbacks
//!
//! 1. [`registry`] - fixed device slots over a hardware backend
//! 2. [`decoder`] - raw state → [`ControllerEvents`] + device commands
//! 3. [`worker`] - polling loop on its own thread
//! 4. [`mailbox`] - latest record per slot, shared with the consumer
//! 5. [`manager`] - worker lifecycle and on-demand drain
//!
//! # Architecture
//!
//! ```text
//!            worker thread                     │        consumer thread
//! Backend ──► Registry ──► Decoder ──publish──► Mailbox ──drain──► callback
//!    ▲                        │                │
//!    └──── DeviceCommand ◄────┘                │
//! ```

pub mod decoder;
pub mod events;
pub mod mailbox;
pub mod manager;
pub mod registry;
pub mod worker;

pub use events::{BalanceBoard, ControllerEvents, Joystick, MoteButton, Orientation, Transition};
pub use manager::{EventCallback, Manager, ManagerError};
pub use worker::{LifecycleState, WorkerError, WorkerSettings};
