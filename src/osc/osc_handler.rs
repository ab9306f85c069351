use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use chrono::{DateTime, Local};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use tracing::{debug, info, trace, warn};

use super::config::OscConfig;

/// Error history kept in [`OscStatus`]
const MAX_ERROR_MESSAGES: usize = 20;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

#[derive(Clone, Debug, Default)]
pub struct OscStatus {
    pub connection_state: ConnectionState,
    pub error_messages: Vec<String>,
    pub messages_sent: usize,
    pub connections_established: usize,
    pub last_activity: Option<DateTime<Local>>,
}

impl OscStatus {
    fn record_error(&mut self, message: String) {
        if self.error_messages.len() >= MAX_ERROR_MESSAGES {
            self.error_messages.remove(0);
        }
        self.error_messages.push(message);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OscError {
    #[error("Invalid OSC target: {0}")]
    InvalidTarget(String),

    #[error("Could not resolve {target}: {message}")]
    Resolve { target: String, message: String },

    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("Failed to encode OSC message: {0}")]
    Encode(String),

    #[error("OSC sender not set up")]
    NotReady,
}

/// UDP sender for OSC messages
///
/// The socket is connected to a single target. Calling [`OscSender::setup`]
/// again with the same target is a no-op.
#[derive(Debug, Default)]
pub struct OscSender {
    socket: Option<UdpSocket>,
    target: Option<OscConfig>,
    status: OscStatus,
}

impl OscSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the sender at `host:port`. Returns whether the sender is ready.
    pub fn setup(&mut self, host: &str, port: u16) -> bool {
        let target = OscConfig::new(host, port);
        if self.is_ready() && self.target.as_ref() == Some(&target) {
            debug!("OSC sender already set up for {}", target);
            return true;
        }

        self.status.connection_state = ConnectionState::Connecting;
        match open_socket(&target) {
            Ok(socket) => {
                info!("OSC sender ready, sending to {}", target);
                self.socket = Some(socket);
                self.target = Some(target);
                self.status.connection_state = ConnectionState::Connected;
                self.status.connections_established += 1;
                self.status.last_activity = Some(Local::now());
                true
            }
            Err(e) => {
                warn!("Could not set up OSC sender for {}: {}", target, e);
                self.socket = None;
                self.target = None;
                self.status.connection_state = ConnectionState::Failed;
                self.status.record_error(e.to_string());
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.socket.is_some()
    }

    /// Encodes and sends one message. Returns false if the sender is not set
    /// up or sending failed.
    pub fn send(&mut self, address: &str, args: Vec<OscType>) -> bool {
        match self.try_send(address, args) {
            Ok(()) => true,
            Err(OscError::NotReady) => false,
            Err(e) => {
                debug!("Sending {} failed: {}", address, e);
                self.status.record_error(e.to_string());
                false
            }
        }
    }

    pub fn try_send(&mut self, address: &str, args: Vec<OscType>) -> Result<(), OscError> {
        let socket = self.socket.as_ref().ok_or(OscError::NotReady)?;

        trace!("OSC {} {:?}", address, args);
        let packet = OscPacket::Message(OscMessage {
            addr: address.to_string(),
            args,
        });
        let bytes = encoder::encode(&packet).map_err(|e| OscError::Encode(e.to_string()))?;
        socket.send(&bytes)?;

        self.status.messages_sent += 1;
        self.status.last_activity = Some(Local::now());
        Ok(())
    }

    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            info!("OSC sender closed");
        }
        self.target = None;
        self.status.connection_state = ConnectionState::Disconnected;
    }

    pub fn target(&self) -> Option<&OscConfig> {
        self.target.as_ref()
    }

    pub fn status(&self) -> &OscStatus {
        &self.status
    }

    /// Short connectivity string for status displays.
    pub fn status_text(&self) -> &'static str {
        if self.is_ready() {
            "connected"
        } else {
            "disconnected"
        }
    }
}

fn open_socket(target: &OscConfig) -> Result<UdpSocket, OscError> {
    target.validate()?;

    let addr: SocketAddr = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| OscError::Resolve {
            target: target.to_string(),
            message: e.to_string(),
        })?
        .next()
        .ok_or_else(|| OscError::Resolve {
            target: target.to_string(),
            message: "no addresses".to_string(),
        })?;

    let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind_addr)?;
    socket.connect(addr)?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::decoder;
    use std::time::Duration;

    #[test]
    fn repeated_setup_keeps_the_connection() {
        let mut sender = OscSender::new();
        assert!(sender.setup("127.0.0.1", 12021));
        assert!(sender.setup("127.0.0.1", 12021));
        assert_eq!(sender.status().connections_established, 1);
        assert_eq!(sender.status_text(), "connected");

        assert!(sender.setup("127.0.0.1", 12022));
        assert_eq!(sender.status().connections_established, 2);
        assert_eq!(sender.target(), Some(&OscConfig::new("127.0.0.1", 12022)));
    }

    #[test]
    fn invalid_target_fails_and_reports_disconnected() {
        let mut sender = OscSender::new();
        assert!(!sender.setup("", 9000));
        assert!(!sender.setup("127.0.0.1", 0));
        assert_eq!(sender.status().connection_state, ConnectionState::Failed);
        assert_eq!(sender.status().error_messages.len(), 2);
        assert_eq!(sender.status_text(), "disconnected");
    }

    #[test]
    fn failed_setup_drops_previous_target() {
        let mut sender = OscSender::new();
        assert!(sender.setup("127.0.0.1", 12021));
        assert!(!sender.setup("", 12021));
        assert!(!sender.is_ready());
    }

    #[test]
    fn send_without_setup_is_refused() {
        let mut sender = OscSender::new();
        assert!(!sender.send("/wiimo/1/mote/rpy", vec![OscType::Float(1.0)]));
        assert!(matches!(
            sender.try_send("/x", Vec::new()),
            Err(OscError::NotReady)
        ));
        assert_eq!(sender.status().messages_sent, 0);
    }

    #[test]
    fn messages_arrive_on_loopback() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut sender = OscSender::new();
        assert!(sender.setup("127.0.0.1", port));
        assert!(sender.send(
            "/wiimo/1/mote/button/3",
            vec![OscType::Bool(true)]
        ));

        let mut buf = [0u8; rosc::decoder::MTU];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = decoder::decode_udp(&buf[..len]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, "/wiimo/1/mote/button/3");
                assert_eq!(msg.args, vec![OscType::Bool(true)]);
            }
            other => panic!("unexpected packet {:?}", other),
        }
        assert_eq!(sender.status().messages_sent, 1);
        assert!(sender.status().last_activity.is_some());
    }

    #[test]
    fn close_resets_state() {
        let mut sender = OscSender::new();
        sender.setup("127.0.0.1", 12021);
        sender.close();
        assert!(!sender.is_ready());
        assert_eq!(sender.status().connection_state, ConnectionState::Disconnected);
        assert!(sender.target().is_none());
    }
}
