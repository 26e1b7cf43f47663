//! # dhcp-dora - DHCPv4 Lease Acquisition
//!
//! A DHCPv4 client that performs the DISCOVER, OFFER, REQUEST, ACK/NAK
//! exchange and reports the resulting lease or the reason it failed.
//!
//! ## Features
//!
//! - Byte-exact DHCPv4 message codec with a typed option table
//! - I/O-free exchange state machine
//! - Pluggable datagram transport (UDP broadcast or in-memory)
//! - Asynchronous operation using Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use dhcp_dora::{ClientConfig, DhcpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mac_addr = [0x62, 0xf9, 0xb8, 0xfc, 0x9d, 0xff];
//!     let config = ClientConfig::new(Some("eth0".to_string()), mac_addr);
//!     let mut client = DhcpClient::bind(config).await?;
//!     let lease = client.run().await?;
//!     println!("Obtained lease: {:?}", lease);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod v4;

pub use client::{DhcpClient, Lease};
pub use config::{Args, ClientConfig};
pub use error::{ClientError, DecodeError, EncodeError};
pub use network::{ChannelTransport, Transport, TransportError, UdpTransport};
