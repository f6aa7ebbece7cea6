#![deny(unsafe_code)]
#![deny(warnings)]
//! Register-level access to the W5500 over the byte transport.
//!
//! Every access is one SPI frame: two address bytes, a control byte
//! selecting the register block and direction, then the data bytes. The
//! chip is polled, never interrupt-driven, and every wait is unbounded;
//! the caller's execution context is the only one there is.

use core::net::Ipv4Addr;
use core::net::SocketAddrV4;

use crate::bus::BusInterface;
use crate::config::{MacAddr, NetInfo, SocketBuffers, SocketId};
use crate::error::Error;
use crate::registers as reg;

/// Driver for one W5500 behind a [`BusInterface`].
pub struct W5500<B> {
    bus: B,
}

impl<B: BusInterface> W5500<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Give the transport back.
    pub fn free(self) -> B {
        self.bus
    }

    /// Probe the chip, soft-reset it, and map per-socket buffer memory.
    ///
    /// Must run before any socket operation; the chip's memory map is
    /// undefined until the buffer sizes are programmed.
    pub fn initialize(&mut self, buffers: &SocketBuffers) -> Result<(), Error<B::Error>> {
        let version = self.read_u8(reg::COMMON_BLOCK, reg::VERSIONR)?;
        if version != reg::CHIP_VERSION {
            return Err(Error::UnknownChip { version });
        }

        // The reset bit self-clears once the chip has reinitialized.
        self.write_u8(reg::COMMON_BLOCK, reg::MR, reg::MR_RST)?;
        while self.read_u8(reg::COMMON_BLOCK, reg::MR)? & reg::MR_RST != 0 {}

        for socket in 0..SocketId::COUNT {
            let block = reg::socket_reg_block(socket as u8);
            self.write_u8(block, reg::SN_RXBUF_SIZE, buffers.rx()[socket])?;
            self.write_u8(block, reg::SN_TXBUF_SIZE, buffers.tx()[socket])?;
        }
        Ok(())
    }

    /// Write the static network identity: gateway, subnet mask, hardware
    /// address, then source IP.
    pub fn set_net_info(&mut self, net: &NetInfo) -> Result<(), Error<B::Error>> {
        self.write(reg::COMMON_BLOCK, reg::GAR, &net.gateway.octets())?;
        self.write(reg::COMMON_BLOCK, reg::SUBR, &net.subnet.octets())?;
        self.write(reg::COMMON_BLOCK, reg::SHAR, &net.mac.octets())?;
        self.write(reg::COMMON_BLOCK, reg::SIPR, &net.ip.octets())?;
        Ok(())
    }

    /// Read the identity back out of the chip.
    pub fn net_info(&mut self) -> Result<NetInfo, Error<B::Error>> {
        let mut gateway = [0; 4];
        let mut subnet = [0; 4];
        let mut mac = [0; 6];
        let mut ip = [0; 4];
        self.read(reg::COMMON_BLOCK, reg::GAR, &mut gateway)?;
        self.read(reg::COMMON_BLOCK, reg::SUBR, &mut subnet)?;
        self.read(reg::COMMON_BLOCK, reg::SHAR, &mut mac)?;
        self.read(reg::COMMON_BLOCK, reg::SIPR, &mut ip)?;
        Ok(NetInfo {
            mac: MacAddr(mac),
            ip: Ipv4Addr::from(ip),
            subnet: Ipv4Addr::from(subnet),
            gateway: Ipv4Addr::from(gateway),
        })
    }

    /// Open `socket` for UDP datagrams bound to the given source port.
    ///
    /// The open is only good if the status register lands in the UDP
    /// state; anything else is reported as [`Error::OpenRejected`].
    pub fn open_udp(&mut self, socket: SocketId, port: u16) -> Result<(), Error<B::Error>> {
        let block = reg::socket_reg_block(socket.index());
        self.write_u8(block, reg::SN_MR, reg::SN_MR_UDP)?;
        self.write_u16(block, reg::SN_PORT, port)?;
        self.command(socket, reg::CR_OPEN)?;

        let status = self.read_u8(block, reg::SN_SR)?;
        if status != reg::SR_UDP {
            return Err(Error::OpenRejected { status });
        }
        Ok(())
    }

    /// Queue one datagram for `dest` and report how many bytes the chip
    /// accepted.
    ///
    /// The chip transmits whole datagrams or nothing: when the socket's
    /// transmit buffer cannot hold the payload, the current free capacity
    /// comes back as a short count and no SEND is issued, so the caller
    /// retries with the same payload.
    pub fn send_to(
        &mut self,
        socket: SocketId,
        payload: &[u8],
        dest: SocketAddrV4,
    ) -> Result<usize, Error<B::Error>> {
        if payload.is_empty() {
            return Ok(0);
        }
        let block = reg::socket_reg_block(socket.index());
        self.write(block, reg::SN_DIPR, &dest.ip().octets())?;
        self.write_u16(block, reg::SN_DPORT, dest.port())?;

        let free = usize::from(self.tx_free_size(socket)?);
        if free < payload.len() {
            return Ok(free);
        }

        let cursor = self.read_u16(block, reg::SN_TX_WR)?;
        self.write(reg::socket_tx_block(socket.index()), cursor, payload)?;
        self.write_u16(block, reg::SN_TX_WR, cursor.wrapping_add(payload.len() as u16))?;
        self.command(socket, reg::CR_SEND)?;
        Ok(payload.len())
    }

    /// Release the socket register set. The beacon's steady-state loop
    /// never reaches this; it exists for callers that do finish.
    pub fn close(&mut self, socket: SocketId) -> Result<(), Error<B::Error>> {
        self.command(socket, reg::CR_CLOSE)
    }

    // The free-size register moves while the chip drains the buffer, so
    // it is read until two consecutive reads agree.
    fn tx_free_size(&mut self, socket: SocketId) -> Result<u16, Error<B::Error>> {
        let block = reg::socket_reg_block(socket.index());
        let mut last = self.read_u16(block, reg::SN_TX_FSR)?;
        loop {
            let next = self.read_u16(block, reg::SN_TX_FSR)?;
            if next == last {
                return Ok(next);
            }
            last = next;
        }
    }

    // Issue a socket command and wait until the chip consumes it.
    fn command(&mut self, socket: SocketId, command: u8) -> Result<(), Error<B::Error>> {
        let block = reg::socket_reg_block(socket.index());
        self.write_u8(block, reg::SN_CR, command)?;
        while self.read_u8(block, reg::SN_CR)? != 0 {}
        Ok(())
    }

    fn write(&mut self, block: u8, addr: u16, data: &[u8]) -> Result<(), Error<B::Error>> {
        self.bus.select()?;
        let io = self.write_frame(block, addr, data);
        let released = self.bus.deselect();
        io?;
        released?;
        Ok(())
    }

    fn read(&mut self, block: u8, addr: u16, data: &mut [u8]) -> Result<(), Error<B::Error>> {
        self.bus.select()?;
        let io = self.read_frame(block, addr, data);
        let released = self.bus.deselect();
        io?;
        released?;
        Ok(())
    }

    fn write_frame(&mut self, block: u8, addr: u16, data: &[u8]) -> Result<(), B::Error> {
        self.bus.write_byte((addr >> 8) as u8)?;
        self.bus.write_byte(addr as u8)?;
        self.bus.write_byte(reg::control_byte(block, true))?;
        for &byte in data {
            self.bus.write_byte(byte)?;
        }
        Ok(())
    }

    fn read_frame(&mut self, block: u8, addr: u16, data: &mut [u8]) -> Result<(), B::Error> {
        self.bus.write_byte((addr >> 8) as u8)?;
        self.bus.write_byte(addr as u8)?;
        self.bus.write_byte(reg::control_byte(block, false))?;
        for byte in data {
            *byte = self.bus.read_byte()?;
        }
        Ok(())
    }

    fn read_u8(&mut self, block: u8, addr: u16) -> Result<u8, Error<B::Error>> {
        let mut byte = [0; 1];
        self.read(block, addr, &mut byte)?;
        Ok(byte[0])
    }

    fn write_u8(&mut self, block: u8, addr: u16, value: u8) -> Result<(), Error<B::Error>> {
        self.write(block, addr, &[value])
    }

    fn read_u16(&mut self, block: u8, addr: u16) -> Result<u16, Error<B::Error>> {
        let mut bytes = [0; 2];
        self.read(block, addr, &mut bytes)?;
        Ok(u16::from_be_bytes(bytes))
    }

    fn write_u16(&mut self, block: u8, addr: u16, value: u16) -> Result<(), Error<B::Error>> {
        self.write(block, addr, &value.to_be_bytes())
    }
}
