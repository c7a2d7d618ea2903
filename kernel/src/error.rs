//! Error types for the kernel core.
//!
//! Errors never cross the user/kernel boundary as exceptions: syscall
//! wrappers collapse a `KernelError` into the stable negative return codes
//! the ABI commits to (see [`crate::syscall`]). Internally, fallible
//! operations return `Result<T, KernelError>` so failure paths stay explicit
//! and composable with `?`.

use core::fmt;

/// Main kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    /// No UNUSED slot was available in the task table.
    TaskTableFull,
    /// A referenced task id does not name a live task.
    ProcessNotFound { pid: u64 },
    /// An LWP group has no unused stack index left (table exhausted).
    NoFreeLwpIndex,
    /// `thread_join`/`wait` target is not a child/sibling of the caller.
    NotOurChild,
    /// The global kernel-lock pool has no free slot for a new xem binding.
    NoFreePoolSlot,

    /// Generic invalid-state invariant check failed.
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// `set_cpu_share` argument was not strictly positive.
    InvalidShare,
    /// `set_cpu_share` would push total stride shares above
    /// [`crate::config::SHAREMAX`].
    ShareCapExceeded,

    /// A semaphore's FIFO waiter queue is full.
    QueueFull,
    /// A reader-writer lock's reader directory has no free slot.
    ReaderDirectoryFull,
    /// Caller already holds the role it is trying to acquire (the
    /// self-deadlock guard), or released a role it never held.
    LockReentry,
    /// The caller was killed while blocked in `thread_join`.
    Killed,

    /// A named resource (by kind and id) does not exist.
    NotFound {
        resource: &'static str,
        id: u64,
    },
}

/// Result type alias for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskTableFull => write!(f, "task table is full"),
            Self::ProcessNotFound { pid } => write!(f, "process {pid} not found"),
            Self::NoFreeLwpIndex => write!(f, "no free lwp stack index in group"),
            Self::NotOurChild => write!(f, "target is not our child/sibling"),
            Self::NoFreePoolSlot => write!(f, "kernel lock pool exhausted"),
            Self::InvalidState { expected, actual } => {
                write!(f, "Invalid state: expected {}, got {}", expected, actual)
            }
            Self::InvalidShare => write!(f, "cpu share must be > 0"),
            Self::ShareCapExceeded => write!(f, "cpu share would exceed share cap"),
            Self::QueueFull => write!(f, "semaphore waiter queue is full"),
            Self::ReaderDirectoryFull => write!(f, "reader directory is full"),
            Self::LockReentry => write!(f, "lock re-entry or release-without-hold"),
            Self::Killed => write!(f, "task was killed"),
            Self::NotFound { resource, id } => write!(f, "{} with id {} not found", resource, id),
        }
    }
}
