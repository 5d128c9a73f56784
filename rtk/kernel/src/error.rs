//! Kernel error type.

use core::fmt;

use rtk_core::{ProcessId, RtkError};

/// Errors returned by kernel entry points.
///
/// A failed create or register call leaves no partial state behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Every thread slot is in use.
    ThreadPoolFull,
    /// Every process slot is in use.
    ProcessPoolFull,
    /// Both periodic task slots are registered.
    PeriodicSlotsFull,
    /// Requested stack does not fit a thread stack region.
    InvalidStackSize { requested: usize },
    /// Thread owner names a process slot that is not in use.
    UnknownProcess(ProcessId),
    /// Launch was attempted with no threads created.
    NoThreads,
    /// Launch was attempted twice.
    AlreadyLaunched,
    /// Configuration rejected by a leaf type.
    Config(RtkError),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadPoolFull => write!(f, "thread pool exhausted"),
            Self::ProcessPoolFull => write!(f, "process pool exhausted"),
            Self::PeriodicSlotsFull => write!(f, "no free periodic task slot"),
            Self::InvalidStackSize { requested } => {
                write!(f, "invalid stack size of {requested} bytes")
            }
            Self::UnknownProcess(pid) => write!(f, "process {pid} does not exist"),
            Self::NoThreads => write!(f, "no thread to launch"),
            Self::AlreadyLaunched => write!(f, "scheduler already launched"),
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KernelError {}

#[cfg(feature = "defmt")]
impl defmt::Format for KernelError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ThreadPoolFull => defmt::write!(fmt, "ThreadPoolFull"),
            Self::ProcessPoolFull => defmt::write!(fmt, "ProcessPoolFull"),
            Self::PeriodicSlotsFull => defmt::write!(fmt, "PeriodicSlotsFull"),
            Self::InvalidStackSize { requested } => {
                defmt::write!(fmt, "InvalidStackSize({=usize})", requested)
            }
            Self::UnknownProcess(pid) => defmt::write!(fmt, "UnknownProcess({})", pid),
            Self::NoThreads => defmt::write!(fmt, "NoThreads"),
            Self::AlreadyLaunched => defmt::write!(fmt, "AlreadyLaunched"),
            Self::Config(err) => defmt::write!(fmt, "Config({})", err),
        }
    }
}

impl From<RtkError> for KernelError {
    fn from(value: RtkError) -> Self {
        Self::Config(value)
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
