//! Human-readable rendering of DHCP messages for logs.
//!
//! Nothing here feeds back into encoding or decoding.

use super::{message::DhcpMessage, options::MessageType};
use std::{
    fmt::{self, Write as _},
    net::Ipv4Addr,
};

type Render = fn(&[u8]) -> String;

/// code, name, value renderer
static OPTION_TABLE: &[(u8, &str, Render)] = &[
    (1, "Subnet Mask", ipv4_list),
    (3, "Router", ipv4_list),
    (6, "DNS Server", ipv4_list),
    (15, "Domain Name", text),
    (31, "Perform Router Discovery", raw),
    (33, "Static Route", raw),
    (43, "Vendor-Specific Information", raw),
    (44, "NetBIOS over TCP/IP Name Server", ipv4_list),
    (46, "NetBIOS over TCP/IP Node Type", raw),
    (47, "NetBIOS over TCP/IP Scope", text),
    (50, "Requested IP Address", ipv4_list),
    (51, "IP Address Lease Time", seconds),
    (53, "DHCP Message Type", message_type),
    (54, "Server Identifier", ipv4_list),
    (55, "Parameter Request List", parameter_list),
    (57, "Maximum DHCP Message Size", raw),
    (58, "Renewal (T1) Time Value", seconds),
    (59, "Rebinding (T2) Time Value", seconds),
    (60, "Vendor Class Identifier", text),
    (61, "Client-identifier", client_identifier),
    (66, "TFTP Server Name", text),
    (67, "Bootfile Name", text),
    (119, "Domain Search", raw),
    (121, "Classless Static Route", raw),
    (249, "Private/Classless Static Route (Microsoft)", raw),
    (252, "Private/Proxy autodiscovery", text),
];

fn lookup(code: u8) -> Option<&'static (u8, &'static str, Render)> {
    OPTION_TABLE.iter().find(|(c, _, _)| *c == code)
}

/// Display name for an option code, e.g. `"Router"` or `"Option 224"`.
pub fn option_name(code: u8) -> String {
    match lookup(code) {
        Some((_, name, _)) => (*name).to_string(),
        None => format!("Option {code}"),
    }
}

/// Renders an option value according to its code.
pub fn option_value(code: u8, value: &[u8]) -> String {
    if value.is_empty() {
        return "Empty".to_string();
    }
    match lookup(code) {
        Some((_, _, render)) => render(value),
        None => text(value),
    }
}

fn raw(value: &[u8]) -> String {
    format!("{value:?}")
}

fn text(value: &[u8]) -> String {
    if value.iter().all(|b| (32..=126).contains(b)) {
        format!("'{}'", String::from_utf8_lossy(value))
    } else {
        raw(value)
    }
}

fn ipv4_list(value: &[u8]) -> String {
    if value.len() % 4 != 0 {
        return raw(value);
    }
    value
        .chunks_exact(4)
        .map(|o| Ipv4Addr::new(o[0], o[1], o[2], o[3]).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn seconds(value: &[u8]) -> String {
    match <[u8; 4]>::try_from(value) {
        Ok(raw) => format!("{} seconds", u32::from_be_bytes(raw)),
        Err(_) => raw(value),
    }
}

fn message_type(value: &[u8]) -> String {
    match MessageType::try_from(value[0]) {
        Ok(kind) => kind.to_string(),
        Err(other) => format!("Unknown ({other})"),
    }
}

fn parameter_list(value: &[u8]) -> String {
    value
        .iter()
        .map(|code| option_name(*code))
        .collect::<Vec<_>>()
        .join(", ")
}

fn client_identifier(value: &[u8]) -> String {
    if value.len() < 2 {
        return raw(value);
    }
    format!("Type {}: {}", value[0], mac(&value[1..]))
}

fn mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn nul_terminated(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn op_name(op: u8) -> &'static str {
    match op {
        1 => "Boot Request",
        2 => "Boot Reply",
        _ => "Unknown",
    }
}

fn htype_name(htype: u8) -> &'static str {
    match htype {
        1 => "Ethernet",
        6 => "IEEE 802",
        15 => "Frame Relay",
        16 => "Asynchronous Transfer Mode (ATM)",
        _ => "Unknown",
    }
}

impl fmt::Display for DhcpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        writeln!(out, "DHCP Message:")?;
        writeln!(out, "  Op Code: {} ({})", self.op, op_name(self.op))?;
        writeln!(out, "  Hardware Type: {} ({})", self.htype, htype_name(self.htype))?;
        writeln!(out, "  Hardware Address Length: {}", self.hlen)?;
        writeln!(out, "  Hops: {}", self.hops)?;
        writeln!(out, "  Transaction ID: 0x{:08x}", self.xid)?;
        writeln!(out, "  Seconds: {}", self.secs)?;
        writeln!(out, "  Flags: 0x{:04x}", self.flags)?;
        writeln!(out, "  Client IP: {}", self.ciaddr)?;
        writeln!(out, "  Your IP: {}", self.yiaddr)?;
        writeln!(out, "  Next Server IP: {}", self.siaddr)?;
        writeln!(out, "  Relay Agent IP: {}", self.giaddr)?;
        writeln!(out, "  Client Hardware Address: {}", mac(self.hardware_address()))?;
        writeln!(out, "  Server Host Name: '{}'", nul_terminated(&self.sname))?;
        writeln!(out, "  Boot File Name: '{}'", nul_terminated(&self.file))?;
        if !self.options.is_empty() {
            writeln!(out, "  DHCP Options:")?;
            for (code, value) in self.options.iter() {
                writeln!(out, "    {}: {}", option_name(code), option_value(code, value))?;
            }
        }
        f.write_str(&out)
    }
}
