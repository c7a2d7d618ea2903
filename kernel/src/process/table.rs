//! The task table and the single global scheduler lock.
//!
//! The task table, the three MLFQ level lists, and the stride set are
//! treated as one long-lived subsystem state protected by one lock --
//! mirroring xv6's single `ptable.lock` rather than per-substructure
//! locking. [`Kernel::lock`] is the only way to touch any of it; every
//! scheduler-visible mutation in this crate takes the guard it returns.

use crate::config::NPROC;
use crate::error::KernelError;
use crate::process::pcb::{Task, TaskId, TaskState};
use crate::sync::spinlock::{SpinLock, SpinLockGuard};

/// Everything the scheduler lock protects: the task table itself, the
/// three MLFQ list heads, the stride set head and totals, the two
/// last-picked memos (MLFQ's and stride's), and the running quantum
/// counter for whichever citizen is currently executing.
pub struct Kernel {
    pub tasks: [Task; NPROC],
    next_id: TaskId,

    pub mlfq_heads: [Option<TaskId>; 3],
    /// The MLFQ's most recently picked anchor, for `nextmlfq`'s
    /// continue-within-quantum and round-robin-skip rules.
    pub last_mlfq: Option<TaskId>,

    pub stride_head: Option<TaskId>,
    pub stride_shares: u8,
    pub mlfqpass: u64,
    /// The top-level scheduling decision's most recently picked anchor,
    /// whichever class it belonged to -- used by `nextproc`'s
    /// continue-within-quantum check. Distinct from `last_mlfq`, which is
    /// the MLFQ's own round-robin cursor and survives across intervening
    /// stride turns.
    pub last_pick: Option<TaskId>,

    /// Ticks of quantum left for whichever citizen (MLFQ or stride) is
    /// currently running, used by both `nextmlfq` and `nextproc` to decide
    /// whether to continue the same pick or rotate.
    pub quantum_left: u32,

    pub ticks: u64,
}

impl Kernel {
    fn new() -> Self {
        Self {
            tasks: core::array::from_fn(|i| Task::empty(i as TaskId)),
            next_id: 1,
            mlfq_heads: [None; 3],
            last_mlfq: None,
            stride_head: None,
            stride_shares: 0,
            mlfqpass: 0,
            last_pick: None,
            quantum_left: 0,
            ticks: 0,
        }
    }

    /// Scan for an UNUSED slot, transition it to EMBRYO and assign it a
    /// fresh id.
    pub fn alloc(&mut self) -> Result<TaskId, KernelError> {
        let slot = self
            .tasks
            .iter_mut()
            .find(|t| t.state == TaskState::Unused)
            .ok_or(KernelError::TaskTableFull)?;
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        *slot = Task::empty(id);
        slot.state = TaskState::Embryo;
        Ok(id)
    }

    /// Requires the slot be ZOMBIE; returns it to UNUSED.
    pub fn free(&mut self, id: TaskId) {
        if let Some(t) = self.task_mut(id) {
            debug_assert_eq!(t.state, TaskState::Zombie, "freeing a non-zombie task");
            *t = Task::empty(id);
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id && t.state != TaskState::Unused)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id && t.state != TaskState::Unused)
    }

    pub fn children_of(&self, parent: TaskId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.parent == Some(parent))
    }
}

lazy_static::lazy_static! {
    /// The one global scheduler lock, wrapping all scheduler-visible state.
    static ref KERNEL: SpinLock<Kernel> = SpinLock::new(Kernel::new());
}

/// Acquire the scheduler lock.
pub fn sched_lock() -> SpinLockGuard<'static, Kernel> {
    KERNEL.lock()
}
