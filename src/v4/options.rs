//! Typed view over the raw DHCP option area.
//!
//! Options are stored as opaque `code -> bytes` entries. Well-known codes get
//! typed readers and writers; anything else passes through untouched.

use bytes::{BufMut as _, Bytes, BytesMut};
use std::{collections::BTreeMap, fmt, net::Ipv4Addr, time::Duration};

/// Option codes used by the client.
pub mod code {
    pub const PAD: u8 = 0;
    pub const SUBNET_MASK: u8 = 1;
    pub const ROUTER: u8 = 3;
    pub const DOMAIN_NAME_SERVER: u8 = 6;
    pub const DOMAIN_NAME: u8 = 15;
    pub const REQUESTED_IP_ADDRESS: u8 = 50;
    pub const ADDRESS_LEASE_TIME: u8 = 51;
    pub const MESSAGE_TYPE: u8 = 53;
    pub const SERVER_IDENTIFIER: u8 = 54;
    pub const PARAMETER_REQUEST_LIST: u8 = 55;
    pub const RENEWAL_TIME: u8 = 58;
    pub const REBINDING_TIME: u8 = 59;
    pub const CLIENT_IDENTIFIER: u8 = 61;
    pub const END: u8 = 255;
}

/// DHCP message type carried in option 53.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => MessageType::Discover,
            2 => MessageType::Offer,
            3 => MessageType::Request,
            4 => MessageType::Decline,
            5 => MessageType::Ack,
            6 => MessageType::Nak,
            7 => MessageType::Release,
            8 => MessageType::Inform,
            other => return Err(other),
        })
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageType::Discover => "DHCPDISCOVER",
            MessageType::Offer => "DHCPOFFER",
            MessageType::Request => "DHCPREQUEST",
            MessageType::Decline => "DHCPDECLINE",
            MessageType::Ack => "DHCPACK",
            MessageType::Nak => "DHCPNAK",
            MessageType::Release => "DHCPRELEASE",
            MessageType::Inform => "DHCPINFORM",
        })
    }
}

/// The option area of a DHCP message.
///
/// Keys are unique; inserting an existing code replaces its value. Iteration
/// (and therefore wire order) is ascending by code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    entries: BTreeMap<u8, Bytes>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: u8, value: impl Into<Bytes>) -> Option<Bytes> {
        self.entries.insert(code, value.into())
    }

    pub fn get(&self, code: u8) -> Option<&Bytes> {
        self.entries.get(&code)
    }

    pub fn remove(&mut self, code: u8) -> Option<Bytes> {
        self.entries.remove(&code)
    }

    pub fn contains(&self, code: u8) -> bool {
        self.entries.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Bytes)> {
        self.entries.iter().map(|(code, value)| (*code, value))
    }

    /// Option 53. `None` when absent, empty, or outside 1..=8.
    pub fn message_type(&self) -> Option<MessageType> {
        self.get(code::MESSAGE_TYPE)
            .and_then(|value| value.first())
            .and_then(|raw| MessageType::try_from(*raw).ok())
    }

    pub fn set_message_type(&mut self, message_type: MessageType) -> &mut Self {
        self.insert(code::MESSAGE_TYPE, vec![message_type as u8]);
        self
    }

    /// Option 61: hardware type byte followed by the hardware address.
    pub fn set_client_identifier(&mut self, htype: u8, hardware_address: &[u8]) -> &mut Self {
        let mut value = BytesMut::with_capacity(1 + hardware_address.len());
        value.put_u8(htype);
        value.extend_from_slice(hardware_address);
        self.insert(code::CLIENT_IDENTIFIER, value.freeze());
        self
    }

    pub fn client_identifier(&self) -> Option<&[u8]> {
        self.get(code::CLIENT_IDENTIFIER).map(|value| &value[..])
    }

    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        self.ipv4(code::REQUESTED_IP_ADDRESS)
    }

    pub fn set_requested_ip(&mut self, ip: Ipv4Addr) -> &mut Self {
        self.insert(code::REQUESTED_IP_ADDRESS, ip.octets().to_vec());
        self
    }

    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        self.ipv4(code::SERVER_IDENTIFIER)
    }

    pub fn set_server_identifier(&mut self, ip: Ipv4Addr) -> &mut Self {
        self.insert(code::SERVER_IDENTIFIER, ip.octets().to_vec());
        self
    }

    /// Option 55. Order and duplicates are kept exactly as given.
    pub fn set_parameter_request_list(&mut self, codes: &[u8]) -> &mut Self {
        self.insert(code::PARAMETER_REQUEST_LIST, codes.to_vec());
        self
    }

    pub fn parameter_request_list(&self) -> Option<&[u8]> {
        self.get(code::PARAMETER_REQUEST_LIST).map(|value| &value[..])
    }

    pub fn subnet_mask(&self) -> Option<Ipv4Addr> {
        self.ipv4(code::SUBNET_MASK)
    }

    pub fn routers(&self) -> Option<Vec<Ipv4Addr>> {
        self.ipv4_list(code::ROUTER)
    }

    pub fn dns_servers(&self) -> Option<Vec<Ipv4Addr>> {
        self.ipv4_list(code::DOMAIN_NAME_SERVER)
    }

    pub fn domain_name(&self) -> Option<String> {
        self.get(code::DOMAIN_NAME)
            .map(|value| String::from_utf8_lossy(value).trim_end_matches('\0').to_string())
    }

    pub fn lease_time(&self) -> Option<Duration> {
        self.get(code::ADDRESS_LEASE_TIME)
            .and_then(|value| <[u8; 4]>::try_from(&value[..]).ok())
            .map(|raw| Duration::from_secs(u32::from_be_bytes(raw) as u64))
    }

    fn ipv4(&self, code: u8) -> Option<Ipv4Addr> {
        self.get(code)
            .and_then(|value| <[u8; 4]>::try_from(&value[..]).ok())
            .map(Ipv4Addr::from)
    }

    fn ipv4_list(&self, code: u8) -> Option<Vec<Ipv4Addr>> {
        let value = self.get(code)?;
        if value.is_empty() || value.len() % 4 != 0 {
            return None;
        }
        Some(
            value
                .chunks_exact(4)
                .map(|octets| Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]))
                .collect(),
        )
    }
}

impl FromIterator<(u8, Bytes)> for Options {
    fn from_iter<I: IntoIterator<Item = (u8, Bytes)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
