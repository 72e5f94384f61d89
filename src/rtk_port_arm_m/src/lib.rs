#![deny(unsafe_op_in_unsafe_fn)]
#![doc = include_str!("./lib.md")]
#![no_std]

#[cfg(doc)]
#[doc = include_str!("../CHANGELOG.md")]
pub mod _changelog_ {}

/// Stack bounds under the full-descending growth model.
pub mod stack;

/// The initial context frame: per-target layouts and the frame builder.
pub mod frame {
    pub mod cfg;
    pub mod imp;
}

/// The fallback path taken by a task body that returns.
pub mod exit;

/// The machine word. Every slot of a context frame is one `Word`.
pub type Word = u32;

/// The entry point of a task. Receives the task's parameter in `r0` and must
/// never return.
pub type TaskEntry = extern "C" fn(usize) -> !;

pub use self::{
    exit::task_exit_trampoline,
    frame::{cfg::*, imp::*},
    stack::{stack_bottom_empty, stack_top, StackRegion, TaskStack},
};
