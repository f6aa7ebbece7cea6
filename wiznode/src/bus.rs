#![deny(unsafe_code)]
#![deny(warnings)]
//! Byte-level transport between the driver and the chip's serial frame.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// The four primitive operations the offload chip is driven through.
///
/// One register transaction is exactly one `select` .. `deselect` window;
/// the driver never releases and re-asserts the line inside a logical
/// multi-byte transfer. Every call blocks until the bus has completed it.
pub trait BusInterface {
    type Error: core::fmt::Debug;

    /// Drive the chip-select line to its asserted level.
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Release the chip-select line after a sequence of byte transfers.
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Clock one byte out of the chip.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Clock one byte into the chip.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;
}

/// Failure in either half of an [`SpiTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiTransportError<S, P> {
    /// The SPI bus itself failed.
    Spi(S),
    /// The chip-select pin could not be driven.
    Pin(P),
}

/// [`BusInterface`] over an embedded-hal SPI bus plus a chip-select pin.
///
/// The pin is software-controlled, matching a controller-mode bus with
/// hardware slave-select disabled.
pub struct SpiTransport<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> SpiTransport<SPI, CS> {
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    /// Give the peripherals back, e.g. to reconfigure the bus.
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> BusInterface for SpiTransport<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    type Error = SpiTransportError<SPI::Error, CS::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(SpiTransportError::Pin)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        // Let the bus drain before the line is released so the last byte
        // is clocked out under an asserted select.
        self.spi.flush().map_err(SpiTransportError::Spi)?;
        self.cs.set_high().map_err(SpiTransportError::Pin)
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut byte = [0u8; 1];
        self.spi.read(&mut byte).map_err(SpiTransportError::Spi)?;
        Ok(byte[0])
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.spi.write(&[byte]).map_err(SpiTransportError::Spi)
    }
}
