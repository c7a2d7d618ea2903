//! Saved CPU register context for a task.
//!
//! Re-exports the x86_64 register-save layout and the raw context-switch
//! entry point; [`crate::process`] only ever touches this through
//! [`Context::new`] and [`switch_context`].

pub use crate::arch::x86_64::context::{
    init_fpu, restore_fpu_state, save_fpu_state, switch_context, X86_64Context as Context,
};
