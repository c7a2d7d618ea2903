//! Synchronization primitives: the base spinlock, the kernel lock pool,
//! the counting semaphore, and the reader/writer lock built on top of it.

pub mod pool;
pub mod rwlock;
pub mod spinlock;
pub mod xem;

pub use rwlock::RwLock;
pub use spinlock::{SpinLock, SpinLockGuard};
pub use xem::Xem;
