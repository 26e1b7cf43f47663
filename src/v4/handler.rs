//! DHCPv4 state machine implementation
//!
//! This module implements the client side of the DISCOVER -> OFFER ->
//! REQUEST -> ACK/NAK exchange. It performs no I/O: the driver feeds it
//! events and executes the actions it returns.

use super::{
    message::{build_dhcp_discover, build_dhcp_request, DhcpMessage},
    options::MessageType,
};
use crate::{
    client::{Action, DhcpStateMachine, Event, Lease},
    error::{ClientError, Step},
};
use std::time::Duration;

/// Where a run currently stands.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExchangeState {
    Init,
    Discovering,
    Requesting,
    Bound,
    Rejected,
    Failed,
}

impl ExchangeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExchangeState::Bound | ExchangeState::Rejected | ExchangeState::Failed
        )
    }
}

/// Bounds on the receive waits of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub offer: Duration,
    pub ack: Duration,
    pub nak: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            offer: Duration::from_secs(10),
            ack: Duration::from_secs(10),
            nak: Duration::from_secs(5),
        }
    }
}

pub struct DhcpV4Handler {
    state: ExchangeState,
    mac_address: [u8; 6],
    xid: u32,
    parameters: Vec<u8>,
    timeouts: Timeouts,
    match_xid: bool,
    awaiting: Option<MessageType>,
}

impl DhcpV4Handler {
    pub fn new(mac_address: [u8; 6], xid: u32, parameters: Vec<u8>) -> Self {
        Self {
            state: ExchangeState::Init,
            mac_address,
            xid,
            parameters,
            timeouts: Timeouts::default(),
            match_xid: true,
            awaiting: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Accept replies regardless of their transaction id.
    pub fn with_xid_matching(mut self, enabled: bool) -> Self {
        self.match_xid = enabled;
        self
    }

    pub fn xid(&self) -> u32 {
        self.xid
    }

    pub fn awaiting(&self) -> Option<MessageType> {
        self.awaiting
    }

    fn encode(msg: &DhcpMessage, step: Step) -> Result<bytes::Bytes, ClientError> {
        msg.encode()
            .map_err(|source| ClientError::Encode { step, source })
    }

    fn fail_with(&mut self, err: ClientError) -> ClientError {
        self.state = ExchangeState::Failed;
        self.awaiting = None;
        err
    }

    fn await_reply(&mut self, expected: MessageType, timeout: Duration) -> Action {
        self.awaiting = Some(expected);
        Action::Await { expected, timeout }
    }

    fn handle_init(&mut self) -> Result<Action, ClientError> {
        let discover = build_dhcp_discover(&self.mac_address, self.xid, &self.parameters);
        let packet = Self::encode(&discover, Step::Discover).map_err(|e| self.fail_with(e))?;
        self.state = ExchangeState::Discovering;
        tracing::info!("Sending DHCPDISCOVER, xid=0x{:08x}", self.xid);
        Ok(Action::Send(packet))
    }

    fn handle_discovering(&mut self, event: Event) -> Result<Action, ClientError> {
        match event {
            Event::Sent => Ok(self.await_reply(MessageType::Offer, self.timeouts.offer)),
            Event::Received(offer) => {
                tracing::info!(
                    "Received DHCPOFFER, offered IP: {}, server: {}",
                    offer.yiaddr,
                    offer.options.server_identifier().unwrap_or(offer.siaddr)
                );
                let request =
                    build_dhcp_request(&self.mac_address, self.xid, offer, &self.parameters);
                let packet =
                    Self::encode(&request, Step::Request).map_err(|e| self.fail_with(e))?;
                self.state = ExchangeState::Requesting;
                self.awaiting = None;
                tracing::info!("Transitioning to Requesting state");
                Ok(Action::Send(packet))
            }
            Event::DeadlineElapsed => {
                tracing::warn!("Timeout waiting for DHCPOFFER");
                Err(self.fail_with(ClientError::NoOffer))
            }
            Event::Start => Err(ClientError::Critical(
                "exchange already started".to_string(),
            )),
        }
    }

    fn handle_requesting(&mut self, event: Event) -> Result<Action, ClientError> {
        match event {
            Event::Sent => Ok(self.await_reply(MessageType::Ack, self.timeouts.ack)),
            Event::Received(reply) => match reply.message_type() {
                Some(MessageType::Ack) => {
                    let lease = Lease::from_ack(reply);
                    self.state = ExchangeState::Bound;
                    self.awaiting = None;
                    Ok(Action::Bind(lease))
                }
                Some(MessageType::Nak) => {
                    tracing::warn!("Received DHCPNAK, server rejected request");
                    self.state = ExchangeState::Rejected;
                    self.awaiting = None;
                    Err(ClientError::Rejected {
                        server: reply.options.server_identifier(),
                    })
                }
                other => Err(ClientError::Critical(format!(
                    "unexpected {other:?} while requesting"
                ))),
            },
            Event::DeadlineElapsed => match self.awaiting {
                Some(MessageType::Ack) => {
                    tracing::warn!("Timeout waiting for DHCPACK, listening for DHCPNAK");
                    Ok(self.await_reply(MessageType::Nak, self.timeouts.nak))
                }
                _ => {
                    tracing::warn!("Timeout waiting for DHCPACK/DHCPNAK");
                    Err(self.fail_with(ClientError::NoAckOrNak))
                }
            },
            Event::Start => Err(ClientError::Critical(
                "exchange already started".to_string(),
            )),
        }
    }
}

impl DhcpStateMachine for DhcpV4Handler {
    fn state(&self) -> ExchangeState {
        self.state
    }

    fn accepts(&self, msg: &DhcpMessage) -> bool {
        let Some(expected) = self.awaiting else {
            return false;
        };
        if self.match_xid && msg.xid != self.xid {
            tracing::debug!(
                "XID mismatch (got 0x{:08x}, ours 0x{:08x}), ignoring packet",
                msg.xid,
                self.xid
            );
            return false;
        }
        match msg.message_type() {
            Some(kind) if kind == expected => true,
            Some(kind) => {
                tracing::debug!("Received {}, waiting for {}", kind, expected);
                false
            }
            None => {
                tracing::debug!("No usable message type option, ignoring packet");
                false
            }
        }
    }

    fn abort(&mut self) {
        self.state = ExchangeState::Failed;
        self.awaiting = None;
    }

    fn handle_event(&mut self, event: Event) -> Result<Action, ClientError> {
        tracing::debug!("Handling event {:?} in state {:?}", event, self.state);
        match self.state {
            ExchangeState::Init => match event {
                Event::Start => self.handle_init(),
                _ => Err(ClientError::Critical(
                    "exchange has not been started".to_string(),
                )),
            },
            ExchangeState::Discovering => self.handle_discovering(event),
            ExchangeState::Requesting => self.handle_requesting(event),
            terminal => Err(ClientError::Critical(format!(
                "exchange already finished in {terminal:?}"
            ))),
        }
    }
}
