#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]
//! W5500 offload-chip driver and UDP beacon bring-up
//!
//! The W5500 carries its own hardwired TCP/IP stack and is driven over SPI
//! one register access at a time. This crate contains everything that does
//! not touch a concrete microcontroller:
//!
//! - **`bus`**: the [`BusInterface`] byte transport the driver is generic
//!   over, plus [`SpiTransport`] for any embedded-hal SPI bus and
//!   chip-select pin
//! - **`w5500`**: register-level chip access (probe, reset, buffer sizing,
//!   network identity, UDP open/send/close)
//! - **`config`**: the node's static configuration data model
//! - **`beacon`**: the one-shot bring-up sequence and the steady-state
//!   send loop
//!
//! Everything blocks on the calling context; there is no executor, no
//! interrupt-driven I/O, and no timeout on any wait. Board crates own the
//! clock/pin setup and hand a transport to [`beacon::bring_up`].

pub mod beacon;
pub mod bus;
pub mod config;
pub mod error;
mod registers;
pub mod w5500;

pub use bus::{BusInterface, SpiTransport, SpiTransportError};
pub use config::{BeaconConfig, MacAddr, NetInfo, SocketBuffers, SocketId};
pub use error::Error;
pub use w5500::W5500;
