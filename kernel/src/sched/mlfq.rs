//! Component B: the three-level MLFQ.
//!
//! Level 0 is highest priority. A task burns its level's quantum
//! (`Q{N}TICKS`) one tick at a time; if it exhausts its whole allotment
//! (`Q{N}ALTMT`, levels 0 and 1 only -- level 2 has none) without
//! blocking, it demotes one level. Every `BSTPRD` ticks, every task above
//! level 0 is boosted straight back to it, so nothing that occasionally
//! blocks starves behind CPU-bound tasks stuck at level 2.
//!
//! Only MLFQ *anchors* -- one per LWP group, see
//! [`crate::process::thread`] -- are ever linked into these lists; which
//! member of a multi-task group actually runs is `nextlwp`'s concern, one
//! layer further down.

use crate::config::{BSTPRD, Q0ALTMT, Q0TICKS, Q1ALTMT, Q1TICKS, Q2TICKS};
use crate::process::pcb::{SchedClass, TaskId, TaskState};
use crate::process::table::Kernel;

const LEVELS: usize = 3;

fn quantum_for(level: u8) -> u32 {
    match level {
        0 => Q0TICKS,
        1 => Q1TICKS,
        _ => Q2TICKS,
    }
}

fn allotment_for(level: u8) -> Option<u32> {
    match level {
        0 => Some(Q0ALTMT),
        1 => Some(Q1ALTMT),
        _ => None,
    }
}

impl Kernel {
    /// Link a fresh (or previously stride-managed) anchor onto the tail of
    /// MLFQ level 0.
    pub fn qpush(&mut self, id: TaskId) {
        self.qpush_at(id, 0);
    }

    fn qpush_at(&mut self, id: TaskId, level: u8) {
        let mut last = None;
        let mut cur = self.mlfq_heads[level as usize];
        while let Some(cursor) = cur {
            last = Some(cursor);
            cur = self.task(cursor).and_then(|t| t.link.next);
        }
        if let Some(t) = self.task_mut(id) {
            t.sched = Some(SchedClass::Mlfq { level, elapsed: 0 });
            t.link.prev = last;
            t.link.next = None;
        }
        match last {
            Some(tail_id) => {
                if let Some(t) = self.task_mut(tail_id) {
                    t.link.next = Some(id);
                }
            }
            None => self.mlfq_heads[level as usize] = Some(id),
        }
    }

    fn qunlink(&mut self, id: TaskId, level: u8) {
        let (prev, next) = self
            .task(id)
            .map(|t| (t.link.prev, t.link.next))
            .unwrap_or((None, None));
        match prev {
            Some(p) => {
                if let Some(t) = self.task_mut(p) {
                    t.link.next = next;
                }
            }
            None => self.mlfq_heads[level as usize] = next,
        }
        if let Some(n) = next {
            if let Some(t) = self.task_mut(n) {
                t.link.prev = prev;
            }
        }
        if let Some(t) = self.task_mut(id) {
            t.link.prev = None;
            t.link.next = None;
        }
    }

    /// Remove an anchor from the MLFQ entirely (it exited, or is switching
    /// to the stride set).
    pub fn qpop(&mut self, id: TaskId) {
        if let Some(SchedClass::Mlfq { level, .. }) = self.task(id).and_then(|t| t.sched) {
            self.qunlink(id, level);
        }
        if let Some(t) = self.task_mut(id) {
            t.sched = None;
        }
    }

    /// Account one elapsed tick for the running anchor `id` against its
    /// level's quantum and allotment, then offer it to `qdown` (a no-op
    /// unless the allotment just ran out). Returns whether the quantum
    /// just ran out (the scheduler should pick again).
    pub fn mlfq_tick(&mut self, id: TaskId) -> bool {
        let Some(SchedClass::Mlfq { level, elapsed }) = self.task(id).and_then(|t| t.sched) else {
            return true;
        };
        let elapsed = elapsed + 1;
        let quantum_done = elapsed % quantum_for(level) == 0;
        if let Some(t) = self.task_mut(id) {
            t.sched = Some(SchedClass::Mlfq { level, elapsed });
        }
        self.qdown(id);
        quantum_done
    }

    /// Demote `id` one MLFQ level, but only if its allotment for the
    /// current level has already run out (or it is already at level 2,
    /// where demotion is a no-op either way). Called both from
    /// `mlfq_tick` every tick and directly by the `yield` syscall, which
    /// otherwise costs nothing beyond giving up the rest of the quantum.
    pub(crate) fn qdown(&mut self, id: TaskId) {
        let Some(SchedClass::Mlfq { level, elapsed }) = self.task(id).and_then(|t| t.sched) else {
            return;
        };
        if level >= 2 {
            return;
        }
        if elapsed < allotment_for(level).unwrap_or(u32::MAX) {
            return;
        }
        let new_level = level + 1;
        self.qunlink(id, level);
        self.qpush_at(id, new_level);
    }

    /// Every `BSTPRD` ticks, move every task above level 0 back to it.
    pub fn qboost(&mut self, now: u64) {
        if now == 0 || now % BSTPRD as u64 != 0 {
            return;
        }
        for level in 1..LEVELS as u8 {
            while let Some(id) = self.mlfq_heads[level as usize] {
                self.qunlink(id, level);
                self.qpush_at(id, 0);
            }
        }
    }

    /// Pick the next `Runnable` anchor, scanning levels 0..2 in priority
    /// order. Within whichever level the previous pick came from, this
    /// round-robins: it resumes just past the last-picked task and wraps
    /// around the level before giving up on it, so two CPU-bound anchors
    /// at the same level alternate instead of starving each other. Anchors
    /// that are merely linked but not currently `Runnable` (running,
    /// sleeping, zombie) are skipped in place, not unlinked -- `wakeup`
    /// only needs to flip their state back, never to re-thread them.
    pub fn nextmlfq(&mut self) -> Option<TaskId> {
        for level in 0..LEVELS as u8 {
            if self.mlfq_heads[level as usize].is_none() {
                continue;
            }
            let resume_after = match self.last_mlfq {
                Some(id) if self.level_of(id) == Some(level) => Some(id),
                _ => None,
            };
            if let Some(picked) = self.scan_level(level, resume_after) {
                self.last_mlfq = Some(picked);
                return Some(picked);
            }
        }
        None
    }

    fn level_of(&self, id: TaskId) -> Option<u8> {
        match self.task(id).and_then(|t| t.sched) {
            Some(SchedClass::Mlfq { level, .. }) => Some(level),
            _ => None,
        }
    }

    /// `Runnable`, or sleeping as a `thread_join` waiter -- both are
    /// pick-eligible per spec (a task blocked in `thread_join` still counts
    /// as occupying its turn). Plain `Sleeping(Normal)` is not. Also used by
    /// `nextproc`'s continuation check and stride scan in `stride.rs`.
    pub(crate) fn is_runnable(&self, id: TaskId) -> bool {
        self.task(id)
            .map(|t| {
                t.state == TaskState::Runnable
                    || t.state
                        == TaskState::Sleeping(crate::process::pcb::SleepReason::ThreadJoin)
            })
            .unwrap_or(false)
    }

    /// Find the first `Runnable` task in `level`'s list strictly after
    /// `resume_after` (or from the head, if `None`); if nothing is found
    /// before the end of the list, wrap around from the head back up to
    /// and including `resume_after` itself.
    fn scan_level(&self, level: u8, resume_after: Option<TaskId>) -> Option<TaskId> {
        let start = match resume_after {
            Some(id) => self.task(id).and_then(|t| t.link.next),
            None => self.mlfq_heads[level as usize],
        };
        let mut cur = start;
        while let Some(id) = cur {
            if self.is_runnable(id) {
                return Some(id);
            }
            cur = self.task(id).and_then(|t| t.link.next);
        }
        let mut cur = self.mlfq_heads[level as usize];
        while let Some(id) = cur {
            if self.is_runnable(id) {
                return Some(id);
            }
            if Some(id) == resume_after {
                break;
            }
            cur = self.task(id).and_then(|t| t.link.next);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::table::sched_lock;

    #[test]
    fn demotes_after_exhausting_the_level_allotment() {
        let mut k = sched_lock();
        let id = k.alloc().unwrap();
        k.task_mut(id).unwrap().state = TaskState::Runnable;
        k.qpush(id);
        for _ in 0..Q0ALTMT {
            k.mlfq_tick(id);
        }
        assert_eq!(
            k.task(id).unwrap().sched,
            Some(SchedClass::Mlfq { level: 1, elapsed: 0 })
        );
    }

    #[test]
    fn boost_restores_level_zero() {
        let mut k = sched_lock();
        let id = k.alloc().unwrap();
        k.task_mut(id).unwrap().state = TaskState::Runnable;
        k.qpush(id);
        for _ in 0..Q0ALTMT {
            k.mlfq_tick(id);
        }
        assert!(matches!(
            k.task(id).unwrap().sched,
            Some(SchedClass::Mlfq { level: 1, .. })
        ));
        k.qboost(BSTPRD as u64);
        assert_eq!(
            k.task(id).unwrap().sched,
            Some(SchedClass::Mlfq { level: 0, elapsed: 0 })
        );
    }

    #[test]
    fn nextmlfq_skips_non_runnable_anchors() {
        let mut k = sched_lock();
        let sleeping = k.alloc().unwrap();
        k.qpush(sleeping); // left Embryo, not Runnable
        let runnable = k.alloc().unwrap();
        k.task_mut(runnable).unwrap().state = TaskState::Runnable;
        k.qpush(runnable);
        assert_eq!(k.nextmlfq(), Some(runnable));
    }

    #[test]
    fn nextmlfq_round_robins_within_a_level() {
        let mut k = sched_lock();
        let a = k.alloc().unwrap();
        k.task_mut(a).unwrap().state = TaskState::Runnable;
        k.qpush(a);
        let b = k.alloc().unwrap();
        k.task_mut(b).unwrap().state = TaskState::Runnable;
        k.qpush(b);

        assert_eq!(k.nextmlfq(), Some(a));
        assert_eq!(k.nextmlfq(), Some(b));
        assert_eq!(k.nextmlfq(), Some(a));
    }
}
