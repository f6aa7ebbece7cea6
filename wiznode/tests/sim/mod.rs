//! Behavioral model of the offload chip sitting behind the byte
//! transport.
//!
//! Decodes the driver's SPI frames against a register file, executes
//! socket commands, and records what would have gone on the wire. Frame
//! discipline is enforced with assertions: a byte clocked outside a
//! chip-select window, or a select re-asserted mid-frame, fails the test
//! immediately. Shared between the integration test binaries.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wiznode::BusInterface;

// Common-block register addresses, as the chip decodes them.
pub const MR: u16 = 0x0000;
pub const GAR: u16 = 0x0001;
pub const SUBR: u16 = 0x0005;
pub const SHAR: u16 = 0x0009;
pub const SIPR: u16 = 0x000F;
pub const VERSIONR: u16 = 0x0039;

// Socket-block register addresses.
pub const SN_MR: u16 = 0x0000;
pub const SN_CR: u16 = 0x0001;
pub const SN_SR: u16 = 0x0003;
pub const SN_PORT: u16 = 0x0004;
pub const SN_DIPR: u16 = 0x000C;
pub const SN_DPORT: u16 = 0x0010;
pub const SN_RXBUF_SIZE: u16 = 0x001E;
pub const SN_TXBUF_SIZE: u16 = 0x001F;
pub const SN_TX_FSR: u16 = 0x0020;
pub const SN_TX_WR: u16 = 0x0024;

pub const SOCK_CLOSED: u8 = 0x00;
pub const SOCK_UDP: u8 = 0x22;

const CHIP_VERSION: u8 = 0x04;
const CR_OPEN: u8 = 0x01;
const CR_CLOSE: u8 = 0x10;
const CR_SEND: u8 = 0x20;
const MODE_RST: u8 = 0x80;
const MODE_UDP: u8 = 0x02;

const TX_BUF_LEN: usize = 2048;
const DEFAULT_FREE: u16 = TX_BUF_LEN as u16;

/// The transport died under the driver; cuts the otherwise endless send
/// loop once a scripted stop point is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusDown;

/// One datagram the chip would have put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub socket: u8,
    pub payload: Vec<u8>,
    pub dest: [u8; 4],
    pub port: u16,
}

struct Frame {
    header: Vec<u8>,
    addr: u16,
    block: u8,
    write: bool,
    fsr_latch: u16,
}

impl Frame {
    fn new() -> Self {
        Self {
            header: Vec::with_capacity(3),
            addr: 0,
            block: 0,
            write: false,
            fsr_latch: 0,
        }
    }
}

enum Target {
    Common,
    Regs(u8),
    Tx(u8),
    Rx(u8),
}

fn target(block: u8) -> Target {
    if block == 0 {
        return Target::Common;
    }
    let socket = block / 4;
    assert!(socket < 8, "reserved block select {block:#04x}");
    match block % 4 {
        1 => Target::Regs(socket),
        2 => Target::Tx(socket),
        3 => Target::Rx(socket),
        _ => panic!("reserved block select {block:#04x}"),
    }
}

struct SocketModel {
    regs: [u8; 0x30],
    tx: [u8; TX_BUF_LEN],
    tx_rd: u16,
}

impl SocketModel {
    fn new() -> Self {
        Self {
            regs: [0; 0x30],
            tx: [0; TX_BUF_LEN],
            tx_rd: 0,
        }
    }
}

struct Model {
    common: [u8; 0x40],
    sockets: [SocketModel; 8],
    selected: bool,
    frame: Option<Frame>,
    stopped: bool,
    sent: Vec<SentDatagram>,
    fsr_script: VecDeque<u16>,
    open_status: u8,
    close_commands: usize,
    resets: usize,
    stop_after_sends: Option<usize>,
}

impl Model {
    fn new() -> Self {
        let mut common = [0; 0x40];
        common[VERSIONR as usize] = CHIP_VERSION;
        Self {
            common,
            sockets: std::array::from_fn(|_| SocketModel::new()),
            selected: false,
            frame: None,
            stopped: false,
            sent: Vec::new(),
            fsr_script: VecDeque::new(),
            open_status: SOCK_UDP,
            close_commands: 0,
            resets: 0,
            stop_after_sends: None,
        }
    }

    fn assert_select(&mut self) -> Result<(), BusDown> {
        if self.stopped {
            return Err(BusDown);
        }
        assert!(!self.selected, "chip select asserted while already active");
        self.selected = true;
        self.frame = Some(Frame::new());
        Ok(())
    }

    fn release_select(&mut self) {
        assert!(self.selected, "chip select released while already inactive");
        self.selected = false;
        self.frame = None;
    }

    fn decode_header(&mut self) {
        let (addr, block, write) = {
            let header = &self.frame.as_ref().unwrap().header;
            let ctl = header[2];
            assert_eq!(ctl & 0x03, 0, "only variable-length data mode is expected");
            (
                u16::from_be_bytes([header[0], header[1]]),
                ctl >> 3,
                ctl & 0x04 != 0,
            )
        };
        let fsr_latch = match (write, target(block)) {
            (false, Target::Regs(_)) if addr == SN_TX_FSR => {
                self.fsr_script.pop_front().unwrap_or(DEFAULT_FREE)
            }
            _ => 0,
        };
        let frame = self.frame.as_mut().unwrap();
        frame.addr = addr;
        frame.block = block;
        frame.write = write;
        frame.fsr_latch = fsr_latch;
    }

    fn clock_in(&mut self, byte: u8) {
        assert!(self.selected, "byte clocked while chip select is inactive");
        let header_len = self.frame.as_ref().unwrap().header.len();
        if header_len < 3 {
            self.frame.as_mut().unwrap().header.push(byte);
            if header_len + 1 == 3 {
                self.decode_header();
            }
            return;
        }

        let (addr, block, write) = {
            let frame = self.frame.as_ref().unwrap();
            (frame.addr, frame.block, frame.write)
        };
        assert!(write, "data write inside a read frame");
        self.frame.as_mut().unwrap().addr = addr.wrapping_add(1);

        match target(block) {
            Target::Common => self.write_common(addr, byte),
            Target::Regs(socket) => self.write_socket_reg(socket, addr, byte),
            Target::Tx(socket) => {
                self.sockets[socket as usize].tx[addr as usize % TX_BUF_LEN] = byte;
            }
            Target::Rx(_) => panic!("data write to the receive buffer"),
        }
    }

    fn clock_out(&mut self) -> u8 {
        assert!(self.selected, "byte clocked while chip select is inactive");
        let frame = self.frame.as_ref().unwrap();
        assert_eq!(frame.header.len(), 3, "read before the frame header is complete");
        assert!(!frame.write, "data read inside a write frame");
        let (addr, block, latch) = (frame.addr, frame.block, frame.fsr_latch);
        self.frame.as_mut().unwrap().addr = addr.wrapping_add(1);

        match target(block) {
            Target::Common => self.common[addr as usize],
            Target::Regs(socket) => match addr {
                SN_CR => 0,
                a if a == SN_TX_FSR => (latch >> 8) as u8,
                a if a == SN_TX_FSR + 1 => latch as u8,
                _ => self.sockets[socket as usize].regs[addr as usize],
            },
            Target::Tx(_) | Target::Rx(_) => panic!("data read from a buffer block"),
        }
    }

    fn write_common(&mut self, addr: u16, byte: u8) {
        if addr == MR && byte & MODE_RST != 0 {
            // A reset self-clears and wipes nothing the tests care about.
            self.resets += 1;
            self.common[MR as usize] = byte & !MODE_RST;
        } else {
            self.common[addr as usize] = byte;
        }
    }

    fn write_socket_reg(&mut self, socket: u8, addr: u16, byte: u8) {
        if addr == SN_CR {
            self.run_command(socket, byte);
        } else {
            self.sockets[socket as usize].regs[addr as usize] = byte;
        }
    }

    fn run_command(&mut self, socket: u8, command: u8) {
        match command {
            CR_OPEN => {
                let mode = self.sockets[socket as usize].regs[SN_MR as usize] & 0x0F;
                let status = if mode == MODE_UDP {
                    self.open_status
                } else {
                    SOCK_CLOSED
                };
                self.sockets[socket as usize].regs[SN_SR as usize] = status;
            }
            CR_CLOSE => {
                self.close_commands += 1;
                self.sockets[socket as usize].regs[SN_SR as usize] = SOCK_CLOSED;
            }
            CR_SEND => self.transmit(socket),
            other => panic!("unexpected socket command {other:#04x}"),
        }
    }

    fn transmit(&mut self, socket: u8) {
        let sock = &mut self.sockets[socket as usize];
        let tx_wr = u16::from_be_bytes([
            sock.regs[SN_TX_WR as usize],
            sock.regs[SN_TX_WR as usize + 1],
        ]);
        let len = tx_wr.wrapping_sub(sock.tx_rd);
        let mut payload = Vec::with_capacity(len as usize);
        for i in 0..len {
            payload.push(sock.tx[sock.tx_rd.wrapping_add(i) as usize % TX_BUF_LEN]);
        }
        sock.tx_rd = tx_wr;
        let dest = [
            sock.regs[SN_DIPR as usize],
            sock.regs[SN_DIPR as usize + 1],
            sock.regs[SN_DIPR as usize + 2],
            sock.regs[SN_DIPR as usize + 3],
        ];
        let port = u16::from_be_bytes([
            sock.regs[SN_DPORT as usize],
            sock.regs[SN_DPORT as usize + 1],
        ]);
        self.sent.push(SentDatagram {
            socket,
            payload,
            dest,
            port,
        });
        if let Some(limit) = self.stop_after_sends {
            if self.sent.len() >= limit {
                self.stopped = true;
            }
        }
    }
}

/// Transport half: moves into the driver under test.
pub struct SimBus(Rc<RefCell<Model>>);

/// Inspection half: stays with the test.
pub struct ChipModel(Rc<RefCell<Model>>);

pub fn sim() -> (SimBus, ChipModel) {
    let model = Rc::new(RefCell::new(Model::new()));
    (SimBus(model.clone()), ChipModel(model))
}

impl BusInterface for SimBus {
    type Error = BusDown;

    fn select(&mut self) -> Result<(), BusDown> {
        self.0.borrow_mut().assert_select()
    }

    fn deselect(&mut self) -> Result<(), BusDown> {
        self.0.borrow_mut().release_select();
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, BusDown> {
        Ok(self.0.borrow_mut().clock_out())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), BusDown> {
        self.0.borrow_mut().clock_in(byte);
        Ok(())
    }
}

impl ChipModel {
    pub fn common(&self, addr: u16, len: usize) -> Vec<u8> {
        self.0.borrow().common[addr as usize..addr as usize + len].to_vec()
    }

    pub fn socket_reg(&self, socket: u8, addr: u16) -> u8 {
        self.0.borrow().sockets[socket as usize].regs[addr as usize]
    }

    pub fn sent(&self) -> Vec<SentDatagram> {
        self.0.borrow().sent.clone()
    }

    pub fn close_commands(&self) -> usize {
        self.0.borrow().close_commands
    }

    pub fn resets(&self) -> usize {
        self.0.borrow().resets
    }

    /// Status the next OPEN command lands the socket in.
    pub fn set_open_status(&self, status: u8) {
        self.0.borrow_mut().open_status = status;
    }

    /// Values served for successive free-size register reads; the default
    /// of a drained buffer applies once the script runs out.
    pub fn set_fsr_script(&self, values: &[u16]) {
        self.0.borrow_mut().fsr_script = values.iter().copied().collect();
    }

    /// Fail the transport once this many datagrams have been captured.
    pub fn stop_after_sends(&self, limit: usize) {
        self.0.borrow_mut().stop_after_sends = Some(limit);
    }

    pub fn set_version(&self, version: u8) {
        self.0.borrow_mut().common[VERSIONR as usize] = version;
    }
}
