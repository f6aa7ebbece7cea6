#![deny(unsafe_code)]
#![deny(warnings)]
//! One-shot bring-up followed by the steady-state send loop.
//!
//! The sequence is strictly linear: chip memory, then network identity,
//! then one UDP socket, then datagrams forever. There is no retry of any
//! bring-up step and no path out of the loop.

use crate::bus::BusInterface;
use crate::config::BeaconConfig;
use crate::error::Error;
use crate::w5500::W5500;

/// Configure the offload chip: buffer memory first, then the static
/// network identity. Any failure here is unrecoverable for the node.
pub fn bring_up<B: BusInterface>(
    bus: B,
    config: &BeaconConfig,
) -> Result<W5500<B>, Error<B::Error>> {
    let mut chip = W5500::new(bus);
    chip.initialize(&config.buffers)?;
    chip.set_net_info(&config.net)?;
    Ok(chip)
}

/// Open the UDP socket and send the configured payload forever.
///
/// A rejected open returns `Ok(())` without a single transmission — the
/// socket stays closed and the node has nothing further to do. Once
/// sending, the only way back out is a transport fault.
pub fn run<B: BusInterface>(
    chip: &mut W5500<B>,
    config: &BeaconConfig,
) -> Result<(), Error<B::Error>> {
    match chip.open_udp(config.socket, config.local_port) {
        Ok(()) => {}
        Err(Error::OpenRejected { .. }) => return Ok(()),
        Err(err) => return Err(err),
    }
    loop {
        send_all(chip, config)?;
    }
}

/// Retry one datagram until the chip reports the full payload length.
///
/// Busy-loops with no backoff and no attempt cap; a transmit buffer that
/// never drains keeps this spinning, matching the node's wait-forever
/// contract everywhere else.
pub fn send_all<B: BusInterface>(
    chip: &mut W5500<B>,
    config: &BeaconConfig,
) -> Result<(), Error<B::Error>> {
    while chip.send_to(config.socket, config.payload, config.destination)? != config.payload.len()
    {}
    Ok(())
}
