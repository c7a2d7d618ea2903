//! Component C: stride scheduling over a reserved share of the CPU.
//!
//! Tasks with a nonzero `share` (1..=`SHAREMAX` percent) compete in a
//! proportional-share set alongside one pseudo-citizen, `mlfqpass`,
//! representing the whole MLFQ's reservation of whatever share the stride
//! set hasn't claimed. Whichever has the lowest pass value runs next; the
//! winner's pass advances by its ticket weight (`GTICKETS / share`), and
//! every turn the *MLFQ* wins, `mlfqpass` advances by
//! `GTICKETS / (100 - total_shares)` -- never by zero, since `SHAREMAX`
//! caps the stride set at 80% and leaves the MLFQ at least 20%.

use crate::config::{GTICKETS, SHAREMAX, SSTICKS};
use crate::error::{KernelError, KernelResult};
use crate::process::pcb::{SchedClass, TaskId, TaskState};
use crate::process::table::Kernel;

impl Kernel {
    fn stride_push(&mut self, id: TaskId, share: u8, pass: u64) {
        let tickets = GTICKETS / share as u64;
        let mut last = None;
        let mut cur = self.stride_head;
        while let Some(cursor) = cur {
            last = Some(cursor);
            cur = self.task(cursor).and_then(|t| t.link.next);
        }
        if let Some(t) = self.task_mut(id) {
            t.sched = Some(SchedClass::Stride {
                share,
                pass,
                tickets,
            });
            t.link.prev = last;
            t.link.next = None;
        }
        match last {
            Some(tail) => {
                if let Some(t) = self.task_mut(tail) {
                    t.link.next = Some(id);
                }
            }
            None => self.stride_head = Some(id),
        }
        self.stride_shares += share;
    }

    fn stride_unlink(&mut self, id: TaskId) {
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
            None => self.stride_head = next,
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

    fn min_stride_pass(&self) -> Option<u64> {
        let mut cur = self.stride_head;
        let mut min = None;
        while let Some(id) = cur {
            if let Some(SchedClass::Stride { pass, .. }) = self.task(id).and_then(|t| t.sched) {
                min = Some(min.map_or(pass, |m: u64| m.min(pass)));
            }
            cur = self.task(id).and_then(|t| t.link.next);
        }
        min
    }

    /// Give `id` a reserved `share` percent of the CPU, moving it out of
    /// the MLFQ (if it was there) and into the stride set. A freshly
    /// joining task's starting pass is `min(current stride minimum,
    /// mlfqpass)`, so it neither starves behind long-run stride citizens
    /// nor immediately monopolizes the CPU by starting at pass zero.
    pub fn set_cpu_share(&mut self, id: TaskId, share: u8) -> KernelResult<()> {
        if share == 0 {
            return Err(KernelError::InvalidShare);
        }
        let existing = match self.task(id).and_then(|t| t.sched) {
            Some(SchedClass::Stride { share, .. }) => share,
            _ => 0,
        };
        let total = self.stride_shares as u16 - existing as u16 + share as u16;
        if total > SHAREMAX as u16 {
            return Err(KernelError::ShareCapExceeded);
        }

        if let Some(SchedClass::Mlfq { .. }) = self.task(id).and_then(|t| t.sched) {
            self.qpop(id);
        } else if self.task(id).and_then(|t| t.sched).is_some() {
            self.stride_shares -= existing;
            self.stride_unlink(id);
        }

        let pass = match self.min_stride_pass() {
            Some(min) => min.min(self.mlfqpass),
            None => self.mlfqpass,
        };
        self.stride_push(id, share, pass);
        Ok(())
    }

    /// The combined stride-set-plus-MLFQ scheduling decision: continue the
    /// previous pick while its quantum remains, otherwise compare the
    /// lowest stride pass against `mlfqpass` and either run that stride
    /// citizen (charging its ticket weight) or hand off to
    /// [`Kernel::nextmlfq`] (charging the MLFQ's ticket weight to
    /// `mlfqpass`).
    pub fn nextproc(&mut self) -> Option<TaskId> {
        // `quantum_left` is decremented once per tick by
        // `crate::sched::tick`, not here -- repeated calls to `nextproc`
        // within the same tick must keep returning the same citizen.
        if self.quantum_left > 0 {
            if let Some(id) = self.last_pick {
                if self.is_runnable(id) {
                    return Some(id);
                }
            }
        }

        let mut best: Option<(u64, TaskId)> = None;
        let mut cur = self.stride_head;
        while let Some(id) = cur {
            if self.is_runnable(id) {
                if let Some(SchedClass::Stride { pass, .. }) = self.task(id).and_then(|t| t.sched)
                {
                    if best.map(|(p, _)| pass < p).unwrap_or(true) {
                        best = Some((pass, id));
                    }
                }
            }
            cur = self.task(id).and_then(|t| t.link.next);
        }

        match best {
            Some((pass, id)) if pass < self.mlfqpass => {
                let tickets = match self.task(id).and_then(|t| t.sched) {
                    Some(SchedClass::Stride { tickets, .. }) => tickets,
                    _ => GTICKETS,
                };
                if let Some(t) = self.task_mut(id) {
                    if let Some(SchedClass::Stride { share, pass, .. }) = t.sched {
                        t.sched = Some(SchedClass::Stride {
                            share,
                            pass: pass + tickets,
                            tickets,
                        });
                    }
                }
                self.last_pick = Some(id);
                self.quantum_left = SSTICKS.saturating_sub(1);
                Some(id)
            }
            _ => {
                let divisor = (100u64 - self.stride_shares as u64).max(1);
                self.mlfqpass += GTICKETS / divisor;
                let picked = self.nextmlfq();
                self.last_pick = picked;
                self.quantum_left = if picked.is_some() { SSTICKS.saturating_sub(1) } else { 0 };
                picked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::table::sched_lock;

    #[test]
    fn rejects_shares_above_the_cap() {
        // A share above SHAREMAX always fails the total-share check (the
        // single task's share alone already exceeds the cap), not the
        // `share == 0` validity check -- matching the original `setsshr`'s
        // two-branch structure.
        let mut k = sched_lock();
        let id = k.alloc().unwrap();
        assert_eq!(
            k.set_cpu_share(id, crate::config::SHAREMAX + 1),
            Err(KernelError::ShareCapExceeded)
        );
    }

    #[test]
    fn rejects_total_share_over_the_cap() {
        let mut k = sched_lock();
        let a = k.alloc().unwrap();
        let b = k.alloc().unwrap();
        k.set_cpu_share(a, crate::config::SHAREMAX).unwrap();
        assert_eq!(
            k.set_cpu_share(b, 1),
            Err(KernelError::ShareCapExceeded)
        );
    }

    #[test]
    fn stride_winner_pass_advances_by_its_ticket_weight() {
        let mut k = sched_lock();
        let id = k.alloc().unwrap();
        k.task_mut(id).unwrap().state = TaskState::Runnable;
        k.set_cpu_share(id, 20).unwrap();
        let before = match k.task(id).unwrap().sched {
            Some(SchedClass::Stride { pass, .. }) => pass,
            _ => unreachable!(),
        };
        k.nextproc();
        let after = match k.task(id).unwrap().sched {
            Some(SchedClass::Stride { pass, .. }) => pass,
            _ => unreachable!(),
        };
        assert_eq!(after - before, GTICKETS / 20);
    }
}
