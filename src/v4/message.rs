//! The DHCP message value and the client's outbound message builders.

use super::options::{code, MessageType, Options};
use bytes::Bytes;
use std::net::Ipv4Addr;

/// Operation code for messages sent by a client.
pub const BOOTREQUEST: u8 = 1;
/// Operation code for messages sent by a server.
pub const BOOTREPLY: u8 = 2;
/// Hardware type for Ethernet.
pub const HTYPE_ETHERNET: u8 = 1;
/// Hardware address length for Ethernet.
pub const HLEN_ETHERNET: u8 = 6;

/// Length of the client hardware address field.
pub const CHADDR_LEN: usize = 16;
/// Length of the server host name field.
pub const SNAME_LEN: usize = 64;
/// Length of the boot file name field.
pub const FILE_LEN: usize = 128;

/// Parameters requested from the server unless the caller supplies its own list.
pub const DEFAULT_PARAMETER_REQUEST_LIST: [u8; 14] =
    [1, 3, 6, 15, 31, 33, 43, 44, 46, 47, 119, 121, 249, 252];

/// A DHCPv4 message as it appears on the wire.
///
/// `chaddr`, `sname` and `file` are kept as plain byte buffers so a message
/// with the wrong field length can be represented; the codec refuses to
/// encode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpMessage {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: Bytes,
    pub sname: Bytes,
    pub file: Bytes,
    pub options: Options,
}

impl Default for DhcpMessage {
    fn default() -> Self {
        Self {
            op: BOOTREQUEST,
            htype: HTYPE_ETHERNET,
            hlen: HLEN_ETHERNET,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: Bytes::from_static(&[0u8; CHADDR_LEN]),
            sname: Bytes::from_static(&[0u8; SNAME_LEN]),
            file: Bytes::from_static(&[0u8; FILE_LEN]),
            options: Options::new(),
        }
    }
}

impl DhcpMessage {
    /// A BOOTREQUEST header for an Ethernet client with every address zeroed.
    pub fn boot_request(xid: u32, mac_addr: &[u8; 6]) -> Self {
        let mut chaddr = [0u8; CHADDR_LEN];
        chaddr[..mac_addr.len()].copy_from_slice(mac_addr);
        Self {
            xid,
            chaddr: Bytes::copy_from_slice(&chaddr),
            ..Self::default()
        }
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.options.message_type()
    }

    /// The first `hlen` bytes of `chaddr`, clamped to the field size.
    pub fn hardware_address(&self) -> &[u8] {
        let len = (self.hlen as usize).min(self.chaddr.len());
        &self.chaddr[..len]
    }
}

/// Constructs a DHCP Discover message.
pub fn build_dhcp_discover(mac_addr: &[u8; 6], xid: u32, parameters: &[u8]) -> DhcpMessage {
    let mut msg = DhcpMessage::boot_request(xid, mac_addr);
    msg.options
        .set_message_type(MessageType::Discover)
        .set_client_identifier(HTYPE_ETHERNET, mac_addr)
        .set_parameter_request_list(parameters);
    msg
}

/// Constructs a DHCP Request message accepting `offer`.
///
/// The requested address comes from the offer's option 50 when present,
/// otherwise from `yiaddr`. The server identifier comes from option 54 when
/// present, otherwise from `siaddr`. Present options are copied verbatim.
pub fn build_dhcp_request(
    mac_addr: &[u8; 6],
    xid: u32,
    offer: &DhcpMessage,
    parameters: &[u8],
) -> DhcpMessage {
    let mut msg = DhcpMessage::boot_request(xid, mac_addr);
    msg.options
        .set_message_type(MessageType::Request)
        .set_client_identifier(HTYPE_ETHERNET, mac_addr);

    match offer.options.get(code::REQUESTED_IP_ADDRESS) {
        Some(requested) => {
            msg.options
                .insert(code::REQUESTED_IP_ADDRESS, requested.clone());
        }
        None => {
            msg.options.set_requested_ip(offer.yiaddr);
        }
    }

    match offer.options.get(code::SERVER_IDENTIFIER) {
        Some(server_id) => {
            msg.options
                .insert(code::SERVER_IDENTIFIER, server_id.clone());
        }
        None => {
            msg.options.set_server_identifier(offer.siaddr);
        }
    }

    msg.options.set_parameter_request_list(parameters);
    msg
}
