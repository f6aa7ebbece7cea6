#![deny(unsafe_code)]
#![deny(warnings)]
//! Driver error types

/// Failures surfaced by the driver and the bring-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The byte transport itself failed.
    Bus(E),
    /// The version register did not identify a W5500.
    UnknownChip { version: u8 },
    /// The OPEN command left the socket in an unexpected state.
    OpenRejected { status: u8 },
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Error::Bus(err)
    }
}

impl<E> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(_) => write!(f, "bus transfer failed"),
            Self::UnknownChip { version } => {
                write!(f, "version register read {version:#04x}, not a W5500")
            }
            Self::OpenRejected { status } => {
                write!(f, "socket open left status {status:#04x}")
            }
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for Error<E> {}
