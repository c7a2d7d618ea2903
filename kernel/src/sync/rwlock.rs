//! Writer-exclusive, many-reader lock built from two [`Xem`]s.
//!
//! `lock` guards the reader directory and the `readers` count; `writelock`
//! is the actual writer gate, held by readers only while `readers > 0` (the
//! classic "first reader locks out writers, last reader lets them back in"
//! construction). A task re-entering either acquire call against a lock it
//! already holds is rejected rather than deadlocked.

use crate::config::XEMQSIZE;
use crate::error::{KernelError, KernelResult};
use crate::process::pcb::TaskId;
use crate::sync::xem::{xem_unlock, xem_wait, Xem};

pub struct RwLock {
    lock: Xem,
    writelock: Xem,
    directory: [Option<TaskId>; XEMQSIZE],
    readers: u32,
    wlowner: Option<TaskId>,
}

impl RwLock {
    pub const fn new() -> Self {
        Self {
            lock: Xem::new(1),
            writelock: Xem::new(1),
            directory: [None; XEMQSIZE],
            readers: 0,
            wlowner: None,
        }
    }

    pub fn init(&mut self) {
        self.lock.init(1);
        self.writelock.init(1);
        self.directory = [None; XEMQSIZE];
        self.readers = 0;
        self.wlowner = None;
    }

    fn directory_contains(&self, id: TaskId) -> bool {
        self.directory.iter().any(|slot| *slot == Some(id))
    }

    fn directory_insert(&mut self, id: TaskId) -> KernelResult<()> {
        for slot in self.directory.iter_mut() {
            if slot.is_none() {
                *slot = Some(id);
                return Ok(());
            }
        }
        Err(KernelError::ReaderDirectoryFull)
    }

    fn directory_remove(&mut self, id: TaskId) -> KernelResult<()> {
        for slot in self.directory.iter_mut() {
            if *slot == Some(id) {
                *slot = None;
                return Ok(());
            }
        }
        Err(KernelError::InvalidState {
            expected: "reader present in directory",
            actual: "reader absent",
        })
    }
}

/// `0` is never assigned to a real task (ids start at 1, see
/// `Kernel::alloc`), so it doubles as the "no current task" case here --
/// which only arises in host tests exercising this module directly,
/// outside any scheduler loop.
fn current() -> TaskId {
    crate::process::current_id().unwrap_or(0)
}

/// Take a read lock. Rejects (rather than deadlocking) if the caller
/// already holds the write lock, is already a registered reader, or the
/// reader directory is full.
pub fn acquire_readlock(rw: &mut RwLock) -> KernelResult<()> {
    let me = current();
    xem_wait(&mut rw.lock)?;

    if rw.wlowner == Some(me) || rw.directory_contains(me) {
        xem_unlock(&mut rw.lock);
        return Err(KernelError::LockReentry);
    }
    if rw.readers as usize >= XEMQSIZE {
        xem_unlock(&mut rw.lock);
        return Err(KernelError::ReaderDirectoryFull);
    }

    let insert = rw.directory_insert(me);
    if let Err(e) = insert {
        xem_unlock(&mut rw.lock);
        return Err(e);
    }
    rw.readers += 1;
    if rw.readers == 1 {
        xem_wait(&mut rw.writelock)?;
    }
    xem_unlock(&mut rw.lock);
    Ok(())
}

/// Take the write lock. Rejects if the caller already holds it (directly
/// or as a registered reader). Not guaranteed FIFO across competing
/// writers beyond whatever order `writelock`'s own queue happens to serve
/// them in, once readers have drained.
pub fn acquire_writelock(rw: &mut RwLock) -> KernelResult<()> {
    let me = current();
    xem_wait(&mut rw.lock)?;

    if rw.wlowner == Some(me) || rw.directory_contains(me) {
        xem_unlock(&mut rw.lock);
        return Err(KernelError::LockReentry);
    }
    xem_unlock(&mut rw.lock);

    xem_wait(&mut rw.writelock)?;
    rw.wlowner = Some(me);
    Ok(())
}

/// Release a read lock previously taken with [`acquire_readlock`].
pub fn release_readlock(rw: &mut RwLock) -> KernelResult<()> {
    let me = current();
    xem_wait(&mut rw.lock)?;
    let result = rw.directory_remove(me);
    if result.is_ok() {
        rw.readers -= 1;
        if rw.readers == 0 {
            xem_unlock(&mut rw.writelock);
        }
    }
    xem_unlock(&mut rw.lock);
    result
}

/// Release a write lock previously taken with [`acquire_writelock`].
pub fn release_writelock(rw: &mut RwLock) {
    rw.wlowner = None;
    xem_unlock(&mut rw.writelock);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_then_reader_is_mutually_exclusive_by_construction() {
        let mut rw = RwLock::new();
        acquire_writelock(&mut rw).unwrap();
        assert_eq!(rw.wlowner, Some(current()));
        release_writelock(&mut rw);
        assert_eq!(rw.wlowner, None);
    }

    #[test]
    fn reader_reentry_is_rejected_not_deadlocked() {
        let mut rw = RwLock::new();
        acquire_readlock(&mut rw).unwrap();
        let err = acquire_readlock(&mut rw).unwrap_err();
        assert_eq!(err, KernelError::LockReentry);
        release_readlock(&mut rw).unwrap();
    }

    #[test]
    fn writer_reentry_is_rejected() {
        let mut rw = RwLock::new();
        acquire_writelock(&mut rw).unwrap();
        let err = acquire_writelock(&mut rw).unwrap_err();
        assert_eq!(err, KernelError::LockReentry);
        release_writelock(&mut rw);
    }

    #[test]
    fn readers_release_unlocks_writelock_only_when_last() {
        let mut rw = RwLock::new();
        acquire_readlock(&mut rw).unwrap();
        assert_eq!(rw.readers, 1);
        release_readlock(&mut rw).unwrap();
        assert_eq!(rw.readers, 0);
    }
}
