//! DHCP client implementation
//!
//! This module contains the driver that runs a [`DhcpStateMachine`] against a
//! [`Transport`]:
//! - Executing send/await actions
//! - The deadline-bounded receive loop
//! - The resulting lease

use crate::{
    config::ClientConfig,
    error::{ClientError, Step},
    network::{Transport, UdpTransport},
    v4::{
        handler::{DhcpV4Handler, ExchangeState, Timeouts},
        message::DhcpMessage,
        options::{MessageType, Options},
    },
};
use bytes::Bytes;
use std::{net::Ipv4Addr, time::Duration};
use tokio::time::Instant;

/// Actions the state machine asks the driver to perform.
#[derive(Debug)]
pub enum Action {
    Send(Bytes),
    Await {
        expected: MessageType,
        timeout: Duration,
    },
    Bind(Lease),
}

/// Inputs the state machine reacts to.
#[derive(Debug)]
pub enum Event<'a> {
    Start,
    Sent,
    Received(&'a DhcpMessage),
    DeadlineElapsed,
}

/// The outcome of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub assigned_ip: Ipv4Addr,
    pub subnet_mask: Option<Ipv4Addr>,
    pub routers: Option<Vec<Ipv4Addr>>,
    pub dns_servers: Option<Vec<Ipv4Addr>>,
    pub domain_name: Option<String>,
    pub lease_duration: Option<Duration>,
    pub server_identifier: Option<Ipv4Addr>,
    /// Every option the server sent in its ACK.
    pub options: Options,
}

impl Lease {
    pub fn from_ack(ack: &DhcpMessage) -> Self {
        let opts = &ack.options;
        Self {
            assigned_ip: ack.yiaddr,
            subnet_mask: opts.subnet_mask(),
            routers: opts.routers(),
            dns_servers: opts.dns_servers(),
            domain_name: opts.domain_name(),
            lease_duration: opts.lease_time(),
            server_identifier: opts.server_identifier(),
            options: opts.clone(),
        }
    }
}

/// Common interface of a DHCP client state machine.
pub trait DhcpStateMachine {
    /// Processes one event and returns the next action for the driver.
    fn handle_event(&mut self, event: Event) -> Result<Action, ClientError>;
    /// Whether a decoded datagram answers the wait currently in progress.
    fn accepts(&self, msg: &DhcpMessage) -> bool;
    /// Marks the run failed after an error outside the state machine.
    fn abort(&mut self);
    fn state(&self) -> ExchangeState;
}

pub struct DhcpClient<T> {
    transport: T,
    state_machine: Box<dyn DhcpStateMachine + Send>,
}

impl DhcpClient<UdpTransport> {
    /// Opens the broadcast sockets described by `config`.
    pub async fn bind(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = UdpTransport::bind(
            config.interface.as_deref(),
            config.client_port,
            (config.broadcast_address, config.server_port).into(),
        )?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> DhcpClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let xid = config.transaction_id.unwrap_or_else(rand::random);
        let handler = DhcpV4Handler::new(config.mac_address, xid, config.parameter_request_list)
            .with_timeouts(Timeouts {
                offer: config.offer_timeout,
                ack: config.ack_timeout,
                nak: config.nak_timeout,
            })
            .with_xid_matching(config.match_transaction_id);
        Self::with_state_machine(transport, Box::new(handler))
    }

    pub fn with_state_machine(
        transport: T,
        state_machine: Box<dyn DhcpStateMachine + Send>,
    ) -> Self {
        Self {
            transport,
            state_machine,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state_machine.state()
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn step(&self, sending: bool) -> Step {
        match (self.state_machine.state(), sending) {
            (ExchangeState::Discovering, true) => Step::Discover,
            (ExchangeState::Discovering, false) => Step::Offer,
            (_, true) => Step::Request,
            (_, false) => Step::AckOrNak,
        }
    }

    /// Reads datagrams until one is accepted by the state machine or
    /// `timeout` elapses. Returns `Ok(None)` on the deadline.
    ///
    /// Datagrams that fail to decode or are not accepted are dropped, and
    /// anything read after the deadline is ignored. A stream of rejected
    /// datagrams cannot extend the wait past `timeout`.
    pub async fn wait_for_response(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<DhcpMessage>, ClientError> {
        let deadline = Instant::now() + timeout;
        tracing::debug!("Waiting for response with timeout: {:?}", timeout);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let datagram = match self.transport.recv_with_deadline(remaining).await {
                Ok(Some(datagram)) => datagram,
                Ok(None) => {
                    tracing::debug!("Timeout waiting for response");
                    return Ok(None);
                }
                Err(source) => {
                    tracing::error!("Transport receive error: {}", source);
                    return Err(ClientError::Receive {
                        step: self.step(false),
                        source,
                    });
                }
            };

            if Instant::now() > deadline {
                tracing::debug!("Dropping {} bytes received after the deadline", datagram.len());
                return Ok(None);
            }

            tracing::debug!("Received {} bytes", datagram.len());
            match DhcpMessage::decode(&datagram) {
                Ok(msg) => {
                    tracing::debug!("Received message:\n{}", msg);
                    if self.state_machine.accepts(&msg) {
                        return Ok(Some(msg));
                    }
                }
                Err(e) => tracing::warn!("Failed to decode DHCP message: {}", e),
            }

            if Instant::now() >= deadline {
                tracing::debug!("Deadline elapsed while discarding responses");
                return Ok(None);
            }
        }
    }

    /// Runs the exchange to completion.
    pub async fn run(&mut self) -> Result<Lease, ClientError> {
        let mut next_action = self.state_machine.handle_event(Event::Start)?;

        loop {
            tracing::info!(
                "State: {:?}, Action: {:?}",
                self.state_machine.state(),
                next_action
            );

            next_action = match next_action {
                Action::Send(packet) => {
                    if let Err(source) = self.transport.send(&packet).await {
                        tracing::error!("Transport send error: {}", source);
                        let step = self.step(true);
                        self.state_machine.abort();
                        return Err(ClientError::Send { step, source });
                    }
                    self.state_machine.handle_event(Event::Sent)?
                }
                Action::Await { timeout, .. } => match self.wait_for_response(timeout).await {
                    Ok(Some(msg)) => self.state_machine.handle_event(Event::Received(&msg))?,
                    Ok(None) => self.state_machine.handle_event(Event::DeadlineElapsed)?,
                    Err(e) => {
                        self.state_machine.abort();
                        return Err(e);
                    }
                },
                Action::Bind(lease) => {
                    tracing::info!("DHCP Bind Successful! Lease: {:?}", lease);
                    return Ok(lease);
                }
            };
        }
    }
}
