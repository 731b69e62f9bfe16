//! Shared test doubles.

use agenstock_core::{Error, RelayController, Result, StreamSession, Transport, TransportEvent};

/// In-memory transport that records sent payloads.
pub struct FakeTransport {
    pub open: bool,
    pub sent: Vec<String>,
}

impl FakeTransport {
    pub const fn open() -> Self {
        Self {
            open: true,
            sent: Vec::new(),
        }
    }
}

impl Transport for FakeTransport {
    fn send(&mut self, text: String) -> Result<()> {
        if !self.open {
            return Err(Error::NotConnected);
        }
        self.sent.push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Relay over an open fake transport, not yet marked connected.
pub fn relay() -> RelayController<FakeTransport> {
    RelayController::new(
        FakeTransport::open(),
        StreamSession::new("3f2a9c1e-77aa-4e0b-9d1f-000000000001", "New Chat"),
    )
}

/// Relay that has already seen the transport's `Open` event.
pub fn connected_relay() -> RelayController<FakeTransport> {
    let mut relay = relay();
    relay.handle_event(TransportEvent::Open);
    relay
}
