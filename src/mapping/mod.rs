//! Mapping of controller records onto output messages.
//!
//! [`OscMapping`] turns a [`crate::controller::ControllerEvents`] record into
//! OSC messages and hands them to a [`MessageSink`], usually the
//! [`crate::osc::OscSender`].

pub mod osc_mapping;
pub mod sink;

pub use osc_mapping::{OscMapping, DEFAULT_PREFIX};
pub use sink::{MessageSink, RecordingSink};
