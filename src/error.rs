//! Error taxonomy for the codec and the lease exchange.

use crate::network::TransportError;
use std::{fmt, net::Ipv4Addr};
use thiserror::Error;

/// Failures while turning a [`DhcpMessage`](crate::v4::DhcpMessage) into wire bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} must be {expected} bytes, got {actual}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("option {code} too long: {len} bytes (max 255)")]
    OptionTooLong { code: u8, len: usize },
}

/// Failures while parsing a received datagram.
///
/// The receive loop treats every variant as "drop this datagram and keep listening".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("data too short for DHCP message: got {len} bytes, want at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("failed to read {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid magic cookie 0x{0:08x}")]
    BadMagicCookie(u32),

    #[error("option {code} is missing its length byte")]
    MissingOptionLength { code: u8 },

    #[error("option {code} declares {declared} bytes, only {remaining} remaining")]
    TruncatedOption {
        code: u8,
        declared: usize,
        remaining: usize,
    },
}

/// The outbound step a run was on when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Discover,
    Offer,
    Request,
    AckOrNak,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Discover => "sending DHCPDISCOVER",
            Step::Offer => "waiting for DHCPOFFER",
            Step::Request => "sending DHCPREQUEST",
            Step::AckOrNak => "waiting for DHCPACK/DHCPNAK",
        })
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to build message while {step}")]
    Encode {
        step: Step,
        #[source]
        source: EncodeError,
    },

    #[error("send failed while {step}")]
    Send {
        step: Step,
        #[source]
        source: TransportError,
    },

    #[error("receive failed while {step}")]
    Receive {
        step: Step,
        #[source]
        source: TransportError,
    },

    #[error("no offer received")]
    NoOffer,

    #[error("no ack/nak received")]
    NoAckOrNak,

    #[error("server rejected request")]
    Rejected { server: Option<Ipv4Addr> },

    #[error("Transport setup failed")]
    Transport(#[from] TransportError),

    #[error("Failed to parse MAC address: {0}")]
    MacParse(String),

    #[error("Interface '{0}' not found or has no MAC address")]
    InterfaceInvalid(String),

    #[error("State machine reached a critical failure: {0}")]
    Critical(String),
}

impl ClientError {
    /// Whether a fresh run with a new transaction id might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::NoOffer | ClientError::NoAckOrNak | ClientError::Rejected { .. }
        )
    }
}
