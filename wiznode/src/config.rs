#![deny(unsafe_code)]
#![deny(warnings)]
//! Node configuration data model
//!
//! Everything here is fixed before bring-up and never mutated afterwards;
//! the structs exist to be written into chip registers exactly once.

use core::net::{Ipv4Addr, SocketAddrV4};

/// 48-bit Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const fn octets(self) -> [u8; 6] {
        self.0
    }
}

/// Static network identity written to the chip during bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetInfo {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

/// Handle onto one of the chip's eight hardware socket register sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketId(u8);

impl SocketId {
    /// Socket register sets available on the chip.
    pub const COUNT: usize = 8;

    /// Returns `None` past the last register set.
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT as u8 {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }
}

/// Rejected socket buffer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferLayoutError {
    /// Entry is not one of the sizes the chip can map (0/1/2/4/8/16 KiB).
    InvalidSize(u8),
    /// A direction's entries outgrow the chip's internal memory.
    CapacityExceeded(u16),
}

impl core::fmt::Display for BufferLayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSize(kb) => write!(f, "{kb} KiB is not a mappable socket buffer size"),
            Self::CapacityExceeded(total) => {
                write!(
                    f,
                    "{total} KiB exceeds the {} KiB available per direction",
                    SocketBuffers::CAPACITY_KB
                )
            }
        }
    }
}

impl core::error::Error for BufferLayoutError {}

/// Per-socket receive/transmit buffer allocation, in KiB.
///
/// The chip backs all eight sockets out of 16 KiB of internal memory per
/// direction. The sum invariant is enforced here, at the configuration
/// boundary, because the hardware itself silently misbehaves when
/// oversubscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketBuffers {
    rx: [u8; SocketId::COUNT],
    tx: [u8; SocketId::COUNT],
}

impl SocketBuffers {
    /// Internal chip memory per direction.
    pub const CAPACITY_KB: u16 = 16;

    pub fn new(
        rx: [u8; SocketId::COUNT],
        tx: [u8; SocketId::COUNT],
    ) -> Result<Self, BufferLayoutError> {
        Self::check_direction(&rx)?;
        Self::check_direction(&tx)?;
        Ok(Self { rx, tx })
    }

    /// The stock layout: 2 KiB for every socket, both directions, which
    /// fills the chip exactly.
    pub const fn uniform() -> Self {
        Self {
            rx: [2; SocketId::COUNT],
            tx: [2; SocketId::COUNT],
        }
    }

    pub fn rx(&self) -> &[u8; SocketId::COUNT] {
        &self.rx
    }

    pub fn tx(&self) -> &[u8; SocketId::COUNT] {
        &self.tx
    }

    fn check_direction(sizes: &[u8; SocketId::COUNT]) -> Result<(), BufferLayoutError> {
        for &kb in sizes {
            if !matches!(kb, 0 | 1 | 2 | 4 | 8 | 16) {
                return Err(BufferLayoutError::InvalidSize(kb));
            }
        }
        let total: u16 = sizes.iter().map(|&kb| u16::from(kb)).sum();
        if total > Self::CAPACITY_KB {
            return Err(BufferLayoutError::CapacityExceeded(total));
        }
        Ok(())
    }
}

impl Default for SocketBuffers {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Everything the bring-up sequence and send loop consume.
pub struct BeaconConfig {
    pub net: NetInfo,
    pub buffers: SocketBuffers,
    pub socket: SocketId,
    /// Source port the socket binds to.
    pub local_port: u16,
    pub destination: SocketAddrV4,
    /// Sent verbatim, no terminator appended.
    pub payload: &'static [u8],
}
