//! DHCPv4 protocol implementation
//!
//! This module contains the DHCPv4-specific implementation including:
//! - Message construction and the wire codec
//! - The option table
//! - State machine handling

pub mod codec;
pub mod diagnostics;
pub mod handler;
pub mod message;
pub mod options;


pub use handler::{DhcpV4Handler, ExchangeState, Timeouts};
pub use message::{build_dhcp_discover, build_dhcp_request, DhcpMessage};
pub use options::{MessageType, Options};
