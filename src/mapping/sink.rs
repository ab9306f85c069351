use rosc::OscType;

use crate::osc::OscSender;

/// Destination for translated messages
pub trait MessageSink {
    fn is_ready(&self) -> bool;

    /// Sends one message; returns false if it could not be sent.
    fn send(&mut self, address: &str, args: Vec<OscType>) -> bool;
}

impl MessageSink for OscSender {
    fn is_ready(&self) -> bool {
        OscSender::is_ready(self)
    }

    fn send(&mut self, address: &str, args: Vec<OscType>) -> bool {
        OscSender::send(self, address, args)
    }
}

/// Sink that keeps every message, for tests and dry runs
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSink {
    pub ready: bool,
    pub messages: Vec<(String, Vec<OscType>)>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            ready: true,
            messages: Vec::new(),
        }
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addresses(&self) -> Vec<&str> {
        self.messages.iter().map(|(a, _)| a.as_str()).collect()
    }

    pub fn find(&self, address: &str) -> Option<&[OscType]> {
        self.messages
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, args)| args.as_slice())
    }
}

impl MessageSink for RecordingSink {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn send(&mut self, address: &str, args: Vec<OscType>) -> bool {
        if !self.ready {
            return false;
        }
        self.messages.push((address.to_string(), args));
        true
    }
}
