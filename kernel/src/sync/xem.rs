//! Counting semaphore ("xem") with a FIFO wait queue and a lazily-bound
//! pool spinlock.
//!
//! Unlike a semaphore that owns its own lock word, an [`Xem`] only binds to
//! one of the global [`crate::sync::pool`] spinlocks while it actually has
//! contended work to do: the first `wait` that cannot proceed immediately
//! claims a slot, and the `unlock` that leaves the value non-negative with
//! an empty queue releases it again. This keeps the spinlock pool small
//! (`NPROC` slots) relative to however many xems a program creates.

use crate::config::XEMQSIZE;
use crate::error::{KernelError, KernelResult};
use crate::process::pcb::TaskId;
use crate::sync::pool;

/// A counting semaphore. `value` follows the usual convention: positive
/// means permits are available, zero-or-negative means `-value` waiters
/// are already queued.
pub struct Xem {
    value: i32,
    lockidx: Option<usize>,
    queue: [TaskId; XEMQSIZE],
    front: usize,
    rear: usize,
    len: usize,
}

impl Xem {
    pub const fn new(initial: i32) -> Self {
        Self {
            value: initial,
            lockidx: None,
            queue: [0; XEMQSIZE],
            front: 0,
            rear: 0,
            len: 0,
        }
    }

    /// Re-initialize to a fresh value, dropping any bound pool slot. Only
    /// safe to call when no task is queued.
    pub fn init(&mut self, initial: i32) {
        debug_assert_eq!(self.len, 0, "xem_init on a semaphore with waiters");
        if let Some(idx) = self.lockidx.take() {
            pool::release(idx);
        }
        self.value = initial;
        self.front = 0;
        self.rear = 0;
        self.len = 0;
    }

    fn enqueue(&mut self, id: TaskId) -> KernelResult<()> {
        if self.len == XEMQSIZE {
            return Err(KernelError::QueueFull);
        }
        self.queue[self.rear] = id;
        self.rear = (self.rear + 1) % XEMQSIZE;
        self.len += 1;
        Ok(())
    }

    fn dequeue(&mut self) -> Option<TaskId> {
        if self.len == 0 {
            return None;
        }
        let id = self.queue[self.front];
        self.front = (self.front + 1) % XEMQSIZE;
        self.len -= 1;
        Some(id)
    }

    /// Wake chan used while a task is queued on this xem: the xem's own
    /// address (stable for the object's lifetime) doubles as the channel.
    fn channel(&self) -> usize {
        core::ptr::addr_of!(self.value) as usize
    }
}

/// Acquire one permit, blocking (FIFO, behind whichever pool slot this xem
/// is bound to) if none are immediately available.
///
/// Implements the five-step wait: (1) lazily bind a pool slot if unbound,
/// blocking on the pool-guard channel if every slot is taken; (2) lock that
/// slot; (3) decrement `value`; (4) if the decrement went negative, enqueue
/// self and sleep, looping back to re-check after each wake (a woken task
/// is not guaranteed to be the one `unlock` intended if a kill raced it);
/// (5) unlock the slot.
pub fn xem_wait(xem: &mut Xem) -> KernelResult<()> {
    loop {
        if xem.lockidx.is_none() {
            match pool::try_claim() {
                Ok(idx) => xem.lockidx = Some(idx),
                Err(_) => {
                    let mut k = crate::process::table::sched_lock();
                    k = crate::process::wait::sleep(pool::pool_guard_channel(), k);
                    drop(k);
                    continue;
                }
            }
        }
        break;
    }

    let idx = xem.lockidx.expect("bound above");
    let _slot = pool::lock(idx);

    if xem.value <= 0 {
        let id = crate::process::current_id().expect("xem_wait with no current task");
        // Enqueue before committing the decrement: a full queue must leave
        // `value` untouched for every other waiter/unlocker, not just fail
        // the caller.
        xem.enqueue(id)?;
        xem.value -= 1;
        let chan = xem.channel();
        drop(_slot);
        let mut k = crate::process::table::sched_lock();
        k = crate::process::wait::sleep(chan, k);
        drop(k);
    } else {
        xem.value -= 1;
    }
    Ok(())
}

/// Release one permit, waking the longest-waiting queued task (if any) in
/// strict FIFO order. Unbinds the pool slot once the xem goes idle
/// (`value >= 0` and the queue empty).
pub fn xem_unlock(xem: &mut Xem) {
    let idx = match xem.lockidx {
        Some(idx) => idx,
        // Nothing has ever contended this xem; releasing an uncontended
        // permit needs no lock at all.
        None => {
            xem.value += 1;
            return;
        }
    };

    let woken = {
        let _slot = pool::lock(idx);
        xem.value += 1;
        xem.dequeue()
    };

    if let Some(id) = woken {
        crate::process::wait::wakeup(xem.channel());
        let _ = id; // wakeup is channel-keyed; id only confirms who was due
    }

    if xem.value >= 0 && xem.len == 0 {
        xem.lockidx = None;
        pool::release(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncontended_wait_and_unlock_round_trip() {
        let mut xem = Xem::new(1);
        xem_wait(&mut xem).unwrap();
        assert_eq!(xem.value, 0);
        xem_unlock(&mut xem);
        assert_eq!(xem.value, 1);
    }

    #[test]
    fn reinit_requires_empty_queue() {
        let mut xem = Xem::new(3);
        xem.init(5);
        assert_eq!(xem.value, 5);
        assert!(xem.lockidx.is_none());
    }
}
