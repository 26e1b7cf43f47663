//! Wire encoding and decoding of [`DhcpMessage`].
//!
//! ```text
//! offset  size  field
//!      0     1  op
//!      1     1  htype
//!      2     1  hlen
//!      3     1  hops
//!      4     4  xid
//!      8     2  secs
//!     10     2  flags
//!     12     4  ciaddr
//!     16     4  yiaddr
//!     20     4  siaddr
//!     24     4  giaddr
//!     28    16  chaddr
//!     44    64  sname
//!    108   128  file
//!    236     4  magic cookie (0x63825363)
//!    240     *  options: [code][len][value...], terminated by 255
//! ```
//!
//! Multi-byte integers are big-endian.

use super::{
    message::{DhcpMessage, CHADDR_LEN, FILE_LEN, SNAME_LEN},
    options::{code, Options},
};
use crate::error::{DecodeError, EncodeError};
use bytes::{Buf, BufMut as _, Bytes, BytesMut};
use std::net::Ipv4Addr;

pub const MAGIC_COOKIE: u32 = 0x6382_5363;

/// Fixed header plus magic cookie.
pub const MIN_MESSAGE_LEN: usize = 240;

const ENCODE_CAPACITY: usize = 300;

impl DhcpMessage {
    /// Serializes the message.
    ///
    /// Entries for `Pad` (0) and `End` (255) in the option table are skipped;
    /// exactly one `End` byte terminates the option area.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        check_len("chaddr", &self.chaddr, CHADDR_LEN)?;
        check_len("sname", &self.sname, SNAME_LEN)?;
        check_len("file", &self.file, FILE_LEN)?;

        let mut buf = BytesMut::with_capacity(ENCODE_CAPACITY);
        buf.put_u8(self.op);
        buf.put_u8(self.htype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.hops);
        buf.put_u32(self.xid);
        buf.put_u16(self.secs);
        buf.put_u16(self.flags);
        buf.put_u32(self.ciaddr.into());
        buf.put_u32(self.yiaddr.into());
        buf.put_u32(self.siaddr.into());
        buf.put_u32(self.giaddr.into());
        buf.extend_from_slice(&self.chaddr);
        buf.extend_from_slice(&self.sname);
        buf.extend_from_slice(&self.file);
        buf.put_u32(MAGIC_COOKIE);

        for (opt, value) in self.options.iter() {
            if opt == code::PAD || opt == code::END {
                continue;
            }
            let len = u8::try_from(value.len()).map_err(|_| EncodeError::OptionTooLong {
                code: opt,
                len: value.len(),
            })?;
            buf.put_u8(opt);
            buf.put_u8(len);
            buf.extend_from_slice(value);
        }
        buf.put_u8(code::END);

        Ok(buf.freeze())
    }

    /// Parses a datagram.
    ///
    /// Option scanning stops at the first `End` byte or at the end of input,
    /// whichever comes first. A repeated option code keeps its last value.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MIN_MESSAGE_LEN {
            return Err(DecodeError::TooShort {
                len: data.len(),
                min: MIN_MESSAGE_LEN,
            });
        }

        let mut cursor = data;
        let op = read_u8(&mut cursor, "op")?;
        let htype = read_u8(&mut cursor, "htype")?;
        let hlen = read_u8(&mut cursor, "hlen")?;
        let hops = read_u8(&mut cursor, "hops")?;
        let xid = read_u32(&mut cursor, "xid")?;
        let secs = read_u16(&mut cursor, "secs")?;
        let flags = read_u16(&mut cursor, "flags")?;
        let ciaddr = Ipv4Addr::from(read_u32(&mut cursor, "ciaddr")?);
        let yiaddr = Ipv4Addr::from(read_u32(&mut cursor, "yiaddr")?);
        let siaddr = Ipv4Addr::from(read_u32(&mut cursor, "siaddr")?);
        let giaddr = Ipv4Addr::from(read_u32(&mut cursor, "giaddr")?);
        let chaddr = read_bytes(&mut cursor, "chaddr", CHADDR_LEN)?;
        let sname = read_bytes(&mut cursor, "sname", SNAME_LEN)?;
        let file = read_bytes(&mut cursor, "file", FILE_LEN)?;

        let cookie = read_u32(&mut cursor, "magic cookie")?;
        if cookie != MAGIC_COOKIE {
            return Err(DecodeError::BadMagicCookie(cookie));
        }

        let options = decode_options(&mut cursor)?;

        Ok(Self {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
            options,
        })
    }
}

fn check_len(field: &'static str, value: &[u8], expected: usize) -> Result<(), EncodeError> {
    if value.len() != expected {
        return Err(EncodeError::FieldLength {
            field,
            expected,
            actual: value.len(),
        });
    }
    Ok(())
}

fn ensure(cursor: &&[u8], field: &'static str, needed: usize) -> Result<(), DecodeError> {
    if cursor.remaining() < needed {
        return Err(DecodeError::Truncated {
            field,
            needed,
            remaining: cursor.remaining(),
        });
    }
    Ok(())
}

fn read_u8(cursor: &mut &[u8], field: &'static str) -> Result<u8, DecodeError> {
    ensure(cursor, field, 1)?;
    Ok(cursor.get_u8())
}

fn read_u16(cursor: &mut &[u8], field: &'static str) -> Result<u16, DecodeError> {
    ensure(cursor, field, 2)?;
    Ok(cursor.get_u16())
}

fn read_u32(cursor: &mut &[u8], field: &'static str) -> Result<u32, DecodeError> {
    ensure(cursor, field, 4)?;
    Ok(cursor.get_u32())
}

fn read_bytes(cursor: &mut &[u8], field: &'static str, len: usize) -> Result<Bytes, DecodeError> {
    ensure(cursor, field, len)?;
    Ok(cursor.copy_to_bytes(len))
}

fn decode_options(cursor: &mut &[u8]) -> Result<Options, DecodeError> {
    let mut options = Options::new();

    while cursor.has_remaining() {
        let opt = cursor.get_u8();
        match opt {
            code::PAD => continue,
            code::END => break,
            _ => {}
        }

        if !cursor.has_remaining() {
            return Err(DecodeError::MissingOptionLength { code: opt });
        }
        let len = cursor.get_u8() as usize;
        if cursor.remaining() < len {
            return Err(DecodeError::TruncatedOption {
                code: opt,
                declared: len,
                remaining: cursor.remaining(),
            });
        }
        options.insert(opt, cursor.copy_to_bytes(len));
    }

    Ok(options)
}
