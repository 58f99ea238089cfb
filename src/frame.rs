//! Ethernet header summaries for diagnostics.

use std::fmt;

use serde::Serialize;

use crate::device::MacAddress;

/// Length of an untagged Ethernet II header.
pub const HEADER_LEN: usize = 14;

/// EtherType of an 802.1Q VLAN tag.
const ETHERTYPE_VLAN: u16 = 0x8100;

/// Header fields of one Ethernet frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSummary {
    /// Destination address.
    pub destination: MacAddress,
    /// Source address.
    pub source: MacAddress,
    /// EtherType of the payload, after any VLAN tag.
    pub ethertype: u16,
    /// VLAN id, if the frame carries an 802.1Q tag.
    pub vlan: Option<u16>,
    /// Total frame length in bytes.
    pub len: usize,
}

impl FrameSummary {
    /// Parses the header of `frame`.
    ///
    /// Returns `None` if the frame is shorter than its header.
    #[must_use]
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < HEADER_LEN {
            return None;
        }

        let mut ethertype = be_u16(frame, 12);
        let mut vlan = None;

        if ethertype == ETHERTYPE_VLAN {
            if frame.len() < HEADER_LEN + 4 {
                return None;
            }
            vlan = Some(be_u16(frame, 14) & 0x0fff);
            ethertype = be_u16(frame, 16);
        }

        Some(Self {
            destination: mac_at(frame, 0),
            source: mac_at(frame, 6),
            ethertype,
            vlan,
            len: frame.len(),
        })
    }

    /// Returns a short protocol name for well-known EtherTypes.
    #[must_use]
    pub const fn protocol(&self) -> Option<&'static str> {
        match self.ethertype {
            0x0800 => Some("IPv4"),
            0x0806 => Some("ARP"),
            0x86dd => Some("IPv6"),
            _ => None,
        }
    }
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ", self.source, self.destination)?;
        match self.protocol() {
            Some(name) => write!(f, "{name}")?,
            None => write!(f, "0x{:04x}", self.ethertype)?,
        }
        if let Some(vlan) = self.vlan {
            write!(f, " vlan {vlan}")?;
        }
        write!(f, ", {} bytes", self.len)
    }
}

fn be_u16(frame: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([frame[at], frame[at + 1]])
}

fn mac_at(frame: &[u8], at: usize) -> MacAddress {
    let mut octets = [0u8; 6];
    octets.copy_from_slice(&frame[at..at + 6]);
    MacAddress::new(octets)
}
