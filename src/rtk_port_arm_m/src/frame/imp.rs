//! The initial context frame builder.
//!
//! This is the only place in the port layer that writes to a task's stack
//! through raw pointers. Frames are built with indexed stores into a word
//! slice, one store per slot, using the offsets in [`FrameLayout::OFFSETS`].
use core::{mem::MaybeUninit, slice};

use crate::{
    poison, FrameLayout, TaskEntry, Target, ThreadingOptions, Word, EXC_RETURN_THREAD_PSP,
    FPSCR_INIT, XPSR_INIT,
};

/// The values that an initial context frame is built from, as raw words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialContext {
    /// The address of the task's entry point. Bit 0 (the Thumb interworking
    /// bit) is ignored.
    pub entry_point: Word,
    /// The address installed as the link register.
    pub exit_trampoline: Word,
    /// The parameter passed to the entry point in `r0`.
    pub param: Word,
}

/// Build the initial context frame for a task using [`Target`]'s layout and
/// `System::exit_task` as the exit trampoline. Returns the initial stack
/// pointer of the task.
///
/// # Safety
///
/// `stack_top` must have been obtained by [`stack_top`](crate::stack_top)
/// from a stack region of `stack_size` words that the caller exclusively
/// owns, and `stack_size` must be at least
/// [`Target::FRAME_WORDS`](FrameLayout::FRAME_WORDS).
///
/// The caller must make the written frame visible to the context switcher
/// before the task becomes eligible for scheduling.
pub unsafe fn build_initial_frame<System: ThreadingOptions>(
    entry: TaskEntry,
    stack_top: *mut Word,
    stack_size: usize,
    param: usize,
) -> *mut Word {
    let ctx = InitialContext {
        entry_point: entry as usize as Word,
        exit_trampoline: System::exit_task as usize as Word,
        param: param as Word,
    };

    // Safety: Upheld by the caller
    let sp = unsafe { write_initial_frame::<Target>(stack_top, stack_size, &ctx) };

    log::trace!(
        "build_initial_frame: entry = {:#010x}, sp = {:p}, layout = {}",
        ctx.entry_point,
        sp,
        <Target as FrameLayout>::NAME,
    );

    sp
}

/// Write an initial context frame of the layout `L` right below `stack_top`.
/// Returns the lowest address written, which is to be used as the task's
/// initial stack pointer.
///
/// Writes exactly [`L::FRAME_WORDS`](FrameLayout::FRAME_WORDS) words and
/// touches nothing else.
///
/// # Safety
///
/// The `L::FRAME_WORDS` words right below `stack_top` must be valid for
/// writes and not aliased. `stack_top` must be word-aligned.
pub unsafe fn write_initial_frame<L: FrameLayout>(
    stack_top: *mut Word,
    stack_size: usize,
    ctx: &InitialContext,
) -> *mut Word {
    #[allow(clippy::let_unit_value)]
    let () = L::OFFSETS_VALID;
    debug_assert!(stack_size >= L::FRAME_WORDS);

    let o = L::OFFSETS;
    let sp = stack_top.wrapping_sub(L::FRAME_WORDS);

    // Safety: Upheld by the caller
    let frame = unsafe { slice::from_raw_parts_mut(sp as *mut MaybeUninit<Word>, L::FRAME_WORDS) };

    // Popped by the processor on exception return

    // xPSR
    frame[o.xpsr] = MaybeUninit::new(XPSR_INIT);
    // PC: The exception return loads this verbatim as the next instruction
    // address, so it must be halfword-aligned. A Thumb code address has bit 0
    // set as an interworking marker; drop it.
    frame[o.pc] = MaybeUninit::new(ctx.entry_point & !1);
    // LR: The return address. This one is consumed by `bx lr`, so the Thumb
    // bit stays.
    frame[o.lr] = MaybeUninit::new(ctx.exit_trampoline);
    // R12, R1-R3: Don't care
    frame[o.r12] = MaybeUninit::new(poison::R12);
    frame[o.r0 + 3] = MaybeUninit::new(poison::R3);
    frame[o.r0 + 2] = MaybeUninit::new(poison::R2);
    frame[o.r0 + 1] = MaybeUninit::new(poison::R1);
    // R0: Parameter to the entry point
    frame[o.r0] = MaybeUninit::new(ctx.param);

    // Popped by the switch trampoline

    // S0-S31, FPSCR
    if let (Some(s0), Some(fpscr)) = (o.fp_block, o.fpscr()) {
        frame[fpscr] = MaybeUninit::new(FPSCR_INIT);
        for n in (0..32).rev() {
            frame[s0 + n] = MaybeUninit::new(poison::s(n));
        }
    }

    // EXC_RETURN
    if let Some(i) = o.exc_return {
        frame[i] = MaybeUninit::new(EXC_RETURN_THREAD_PSP);
    }

    // R4-R11: Don't care
    for (i, &value) in poison::R4_R11.iter().enumerate().rev() {
        frame[o.r4 + i] = MaybeUninit::new(value);
    }

    sp
}

/// The decoded contents of a context frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView {
    /// `r0`–`r3`
    pub r0_r3: [Word; 4],
    pub r12: Word,
    pub lr: Word,
    pub pc: Word,
    pub xpsr: Word,
    pub exc_return: Option<Word>,
    /// `s0`–`s31`
    pub s: Option<[Word; 32]>,
    pub fpscr: Option<Word>,
    /// `r4`–`r11`
    pub r4_r11: [Word; 8],
}

/// Decode the context frame of the layout `L` at a saved stack pointer `sp`.
///
/// # Safety
///
/// The `L::FRAME_WORDS` words starting at `sp` must be valid for reads and
/// initialized.
pub unsafe fn read_frame<L: FrameLayout>(sp: *const Word) -> FrameView {
    #[allow(clippy::let_unit_value)]
    let () = L::OFFSETS_VALID;
    let o = L::OFFSETS;
    // Safety: Upheld by the caller
    let frame = unsafe { slice::from_raw_parts(sp, L::FRAME_WORDS) };

    let mut r4_r11 = [0; 8];
    r4_r11.copy_from_slice(&frame[o.r4..o.r4 + 8]);

    let mut r0_r3 = [0; 4];
    r0_r3.copy_from_slice(&frame[o.r0..o.r0 + 4]);

    let s = o.fp_block.map(|s0| {
        let mut s = [0; 32];
        s.copy_from_slice(&frame[s0..s0 + 32]);
        s
    });

    FrameView {
        r0_r3,
        r12: frame[o.r12],
        lr: frame[o.lr],
        pc: frame[o.pc],
        xpsr: frame[o.xpsr],
        exc_return: o.exc_return.map(|i| frame[i]),
        s,
        fpscr: o.fpscr().map(|i| frame[i]),
        r4_r11,
    }
}

/// List the slots of the layout `L` that [`write_initial_frame`] fills with
/// poison patterns, as `(offset, pattern)` pairs.
pub fn poison_slots<L: FrameLayout>() -> impl Iterator<Item = (usize, Word)> + Clone {
    let o = L::OFFSETS;
    let exc_frame = [
        (o.r0 + 1, poison::R1),
        (o.r0 + 2, poison::R2),
        (o.r0 + 3, poison::R3),
        (o.r12, poison::R12),
    ];
    let extra_ctx = (0..8).map(move |i| (o.r4 + i, poison::R4_R11[i]));
    let fp_block = o
        .fp_block
        .into_iter()
        .flat_map(|s0| (0..32).map(move |n| (s0 + n, poison::s(n))));

    exc_frame.into_iter().chain(extra_ctx).chain(fp_block)
}
