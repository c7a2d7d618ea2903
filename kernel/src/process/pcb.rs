//! The task: one fixed-capacity slot in the global task table.
//!
//! Unlike a Process-owns-Threads hierarchy, every schedulable entity here --
//! a plain task and every member of an LWP group alike -- is one `Task` in
//! one flat table. What makes an LWP group behave as a single MLFQ/stride
//! citizen is purely the `oproc`/anchor relationship between `Task`s (see
//! [`crate::process::thread`]), not a separate container type.

use crate::arch::context::Context;
use crate::config::NOFILE;

/// Numeric task identity. Monotonically assigned, never reused while a
/// task using it is live.
pub type TaskId = u32;

/// An opaque sleep/wake channel. Two sleepers with the same channel wake
/// together; the value itself carries no meaning beyond identity (the
/// source this is grounded on uses arbitrary kernel addresses for this --
/// a task's own table index doubles as its channel here, see
/// [`crate::process::wait`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(pub usize);

/// Why a task is sleeping. Carried only for diagnostics -- the scheduler
/// treats `Sleeping(Normal)` and `Sleeping(ThreadJoin)` identically when
/// deciding who is eligible to be woken (`wakeup` matches on channel
/// regardless of reason).
///
/// The source this core is grounded on modeled these as two separate task
/// states (SLEEPING and TJOINING); folding them into one state with a
/// reason tag removes the duplicated match arms that distinction forced
/// on every consumer of task state, without losing the ability to tell
/// them apart for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepReason {
    Normal,
    ThreadJoin,
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Unused,
    Embryo,
    Sleeping(SleepReason),
    Runnable,
    Running,
    Zombie,
}

/// MLFQ/stride scheduling fields. The absence of a `SchedClass` (i.e.
/// `Task::sched == None`) means the task is neither MLFQ- nor
/// stride-managed: either it is not an anchor, or it has not been
/// enqueued yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedClass {
    /// In MLFQ at the given level (0, 1 or 2), with ticks elapsed in that
    /// level since the last demotion or boost.
    Mlfq { level: u8, elapsed: u32 },
    /// In the stride set with this percent share (1..=80), pass value and
    /// ticket weight `GTICKETS / share`.
    Stride { share: u8, pass: u64, tickets: u64 },
}

/// Intrusive doubly-linked-list position within whichever ready list
/// (an MLFQ level or the stride set) a task is currently linked into.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListLink {
    pub prev: Option<TaskId>,
    pub next: Option<TaskId>,
}

/// LWP-group-specific fields. Present on every task; meaningless (and
/// zeroed) on a task that is not part of a multi-member group.
#[derive(Debug, Clone, Copy)]
pub struct LwpFields {
    /// Stack slot index within the group; 0 is reserved for the anchor.
    pub lwpidx: u32,
    /// Where `thread_join` copies the exit value on success.
    pub retval: i64,
    /// The anchor's memoised "last picked" member index, consulted only
    /// when `self` is the anchor.
    pub schidx: u32,
}

impl Default for LwpFields {
    fn default() -> Self {
        Self {
            lwpidx: 0,
            retval: 0,
            schidx: 0,
        }
    }
}

/// One task-table slot.
pub struct Task {
    pub id: TaskId,
    pub name: [u8; 16],
    pub state: TaskState,

    pub parent: Option<TaskId>,
    /// The scheduler-visible anchor of this task's LWP group. `None` for
    /// an anchor (including ordinary, non-LWP tasks, which are trivially
    /// anchors of a one-member group).
    pub oproc: Option<TaskId>,

    pub sz: usize,
    pub hpsz: usize,

    pub sched: Option<SchedClass>,
    pub link: ListLink,

    pub lwp: LwpFields,

    /// Current sleep channel, if sleeping.
    pub chan: Option<Channel>,
    pub killed: bool,

    pub context: Context,
    pub kstack: usize,

    /// Open-file presence bitmap; bookkeeping only (no filesystem backs
    /// this core -- see spec non-goals).
    pub open_files: [bool; NOFILE],
}

impl Task {
    /// An UNUSED slot ready to be claimed by `alloc`.
    pub fn empty(id: TaskId) -> Self {
        Self {
            id,
            name: [0; 16],
            state: TaskState::Unused,
            parent: None,
            oproc: None,
            sz: 0,
            hpsz: 0,
            sched: None,
            link: ListLink::default(),
            lwp: LwpFields::default(),
            chan: None,
            killed: false,
            context: Context::default(),
            kstack: 0,
            open_files: [false; NOFILE],
        }
    }

    /// This task's own scheduling anchor: itself if it has none.
    pub fn anchor_id(&self) -> TaskId {
        self.oproc.unwrap_or(self.id)
    }

    pub fn is_anchor(&self) -> bool {
        self.oproc.is_none()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = [0; 16];
        for (slot, byte) in self.name.iter_mut().zip(name.as_bytes()) {
            *slot = *byte;
        }
    }

    pub fn name_str(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or("?")
    }
}
