use crate::{error::ClientError, v4::message::DEFAULT_PARAMETER_REQUEST_LIST};
use clap::Parser;
use std::{net::Ipv4Addr, time::Duration};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The network interface to bind to (e.g., 'eth0', 'lo')
    #[arg(short, long)]
    pub interface: String,

    /// Hardware address to use instead of the interface's own (e.g., '62:f9:b8:fc:9d:ff')
    #[arg(short, long)]
    pub mac: Option<String>,

    /// Seconds to wait for a DHCPOFFER
    #[arg(long, default_value_t = 10)]
    pub offer_timeout: u64,

    /// Seconds to wait for a DHCPACK
    #[arg(long, default_value_t = 10)]
    pub ack_timeout: u64,

    /// Seconds to wait for a DHCPNAK after the DHCPACK wait expires
    #[arg(long, default_value_t = 5)]
    pub nak_timeout: u64,

    /// Fixed transaction id in hex instead of a random one
    #[arg(long, value_parser = parse_xid)]
    pub xid: Option<u32>,

    /// Accept replies carrying any transaction id
    #[arg(long)]
    pub accept_any_xid: bool,
}

fn parse_xid(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid transaction id '{s}': {e}"))
}

impl Args {
    pub fn into_config(self, mac_address: [u8; 6]) -> ClientConfig {
        let mut config = ClientConfig::new(Some(self.interface), mac_address);
        config.offer_timeout = Duration::from_secs(self.offer_timeout);
        config.ack_timeout = Duration::from_secs(self.ack_timeout);
        config.nak_timeout = Duration::from_secs(self.nak_timeout);
        config.transaction_id = self.xid;
        config.match_transaction_id = !self.accept_any_xid;
        config
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Device to pin the socket to; `None` binds on every interface.
    pub interface: Option<String>,
    pub mac_address: [u8; 6],
    pub client_port: u16,
    pub server_port: u16,
    pub broadcast_address: Ipv4Addr,
    pub offer_timeout: Duration,
    pub ack_timeout: Duration,
    pub nak_timeout: Duration,
    /// Fixed transaction id; a random one is drawn per run when unset.
    pub transaction_id: Option<u32>,
    /// Drop replies whose transaction id is not ours.
    pub match_transaction_id: bool,
    pub parameter_request_list: Vec<u8>,
}

impl ClientConfig {
    pub fn new(interface: Option<String>, mac_address: [u8; 6]) -> Self {
        Self {
            interface,
            mac_address,
            client_port: 68,
            server_port: 67,
            broadcast_address: Ipv4Addr::BROADCAST,
            offer_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(10),
            nak_timeout: Duration::from_secs(5),
            transaction_id: None,
            match_transaction_id: true,
            parameter_request_list: DEFAULT_PARAMETER_REQUEST_LIST.to_vec(),
        }
    }
}

/// Parses a MAC address string (e.g., "0a:1b:2c:3d:4e:5f").
pub fn parse_mac_address(mac_str: &str) -> Result<[u8; 6], ClientError> {
    let mut mac = [0u8; 6];
    let mut parts = mac_str.trim().split(':');
    for byte in mac.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| ClientError::MacParse(mac_str.to_string()))?;
        *byte = u8::from_str_radix(part, 16)
            .map_err(|e| ClientError::MacParse(format!("{mac_str}: {e}")))?;
    }
    if parts.next().is_some() {
        return Err(ClientError::MacParse(mac_str.to_string()));
    }
    Ok(mac)
}
