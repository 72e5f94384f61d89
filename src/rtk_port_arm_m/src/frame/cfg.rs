use crate::Word;

/// The initial value of `xPSR`. Only the `T` (Thumb) bit is set, which is the
/// only valid execution state on Arm-M.
pub const XPSR_INIT: Word = 1 << 24;

/// `EXC_RETURN`: “Return to Thread Mode; Exception return gets state from the
/// Process stack; On return execution uses the Process Stack.” `FType = 1`,
/// i.e., no floating-point context is active yet.
///
/// Also valid on Armv8-M as long as TrustZone is not in use.
pub const EXC_RETURN_THREAD_PSP: Word = 0xffff_fffd;

/// The initial value of `FPSCR` in the floating-point block.
pub const FPSCR_INIT: Word = 0;

/// The number of words in the exception frame pushed and popped by hardware
/// (`r0`–`r3`, `r12`, `lr`, `pc`, `xPSR`).
pub const EXC_FRAME_WORDS: usize = 8;

/// The number of words in the floating-point block (`s0`–`s31`, `FPSCR`).
pub const FP_BLOCK_WORDS: usize = 33;

/// The number of words saved and restored by the switch trampoline
/// (`r4`–`r11`), not including the optional blocks.
pub const EXTRA_CTX_WORDS: usize = 8;

/// Poison patterns for the registers whose initial values don't matter.
///
/// The register number is spelled out in the low half so that the origin of
/// a stray value is obvious in a memory dump. The high half places every
/// pattern in the external device region (`0xa000_0000..0xe000_0000`) of the
/// Armv6-M/v7-M/v8-M memory map, away from code, SRAM, peripherals, and the
/// system region, so a poison value never passes for a pointer.
pub mod poison {
    use crate::Word;

    pub const R1: Word = 0xa5a5_0101;
    pub const R2: Word = 0xa5a5_0202;
    pub const R3: Word = 0xa5a5_0303;
    pub const R12: Word = 0xa5a5_1212;

    /// `r4`–`r11`
    pub const R4_R11: [Word; 8] = [
        0xa5a5_0404,
        0xa5a5_0505,
        0xa5a5_0606,
        0xa5a5_0707,
        0xa5a5_0808,
        0xa5a5_0909,
        0xa5a5_1010,
        0xa5a5_1111,
    ];

    /// Get the poison pattern for `s{n}`.
    pub const fn s(n: usize) -> Word {
        0xb5b5_0000 + n as Word * 0x0101
    }

    /// Check if `value` could be a code, data, or register address on an
    /// Arm-M core, i.e., lies outside the external device region.
    pub const fn is_address_like(value: Word) -> bool {
        !(value >= 0xa000_0000 && value < 0xe000_0000)
    }
}

/// Word offsets of the slots in an initial context frame, measured upward from
/// the initial stack pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOffsets {
    /// `r4` (followed by `r5`–`r11`)
    pub r4: usize,
    /// `EXC_RETURN`
    pub exc_return: Option<usize>,
    /// `s0` (followed by `s1`–`s31` and `FPSCR`)
    pub fp_block: Option<usize>,
    /// `r0` (followed by `r1`–`r3`)
    pub r0: usize,
    pub r12: usize,
    pub lr: usize,
    pub pc: usize,
    pub xpsr: usize,
    /// The total number of words
    pub len: usize,
}

impl FrameOffsets {
    /// Calculate the offset table for the given configuration.
    pub const fn new(has_exc_return_slot: bool, has_fp_block: bool) -> Self {
        let r4 = 0;
        let mut i = r4 + EXTRA_CTX_WORDS;

        let exc_return = if has_exc_return_slot {
            i += 1;
            Some(i - 1)
        } else {
            None
        };

        let fp_block = if has_fp_block {
            i += FP_BLOCK_WORDS;
            Some(i - FP_BLOCK_WORDS)
        } else {
            None
        };

        let r0 = i;
        Self {
            r4,
            exc_return,
            fp_block,
            r0,
            r12: r0 + 4,
            lr: r0 + 5,
            pc: r0 + 6,
            xpsr: r0 + 7,
            len: r0 + EXC_FRAME_WORDS,
        }
    }

    /// Check that the blocks are packed without gaps or overlaps in the order
    /// the switch trampoline pops them (extra context, `EXC_RETURN`, FP
    /// block, exception frame) and that the exception frame ends at `len`,
    /// right below the initial stack pointer.
    pub const fn is_well_formed(&self) -> bool {
        let mut next = 0;

        if self.r4 != next {
            return false;
        }
        next += EXTRA_CTX_WORDS;

        if let Some(i) = self.exc_return {
            if i != next {
                return false;
            }
            next += 1;
        }

        if let Some(i) = self.fp_block {
            if i != next {
                return false;
            }
            next += FP_BLOCK_WORDS;
        }

        self.r0 == next
            && self.r12 == next + 4
            && self.lr == next + 5
            && self.pc == next + 6
            && self.xpsr == next + 7
            && self.len == next + EXC_FRAME_WORDS
    }

    /// Get the offset of `FPSCR`.
    pub const fn fpscr(&self) -> Option<usize> {
        match self.fp_block {
            Some(i) => Some(i + FP_BLOCK_WORDS - 1),
            None => None,
        }
    }
}

#[doc = svgbobdoc::transform!(
/// A layout of the initial context frame, fixed per physical target.
///
/// <center>
///
/// ```svgbob
///          stack top ──▶ ┌──────────────┐ ─┐
///                        │ xPSR         │  │
///                        │ PC (entry)   │  │
///                        │ LR (exit)    │  │  exception frame
///                        │ r12          │  │  (hardware)
///                        │ r3 .. r1     │  │
///                        │ r0 (param)   │  │
///                        ├──────────────┤ ─┘
///                        │ FPSCR        │  │  FP block
///                        │ s31 .. s0    │  │  (HAS_FP_BLOCK)
///                        ├──────────────┤ ─┘
///                        │ EXC_RETURN   │     HAS_EXC_RETURN_SLOT
///                        ├──────────────┤ ─┐
///                        │ r11 .. r5    │  │  extra context
///       initial sp ──▶   │ r4           │  │  (switch trampoline)
///                        └──────────────┘ ─┘
/// ```
///
/// </center>
///
/// The layout must match, word for word, the frame the kernel's switch
/// trampoline leaves on a task's stack when the task is preempted.
)]
pub trait FrameLayout {
    /// A human-readable name of the layout.
    const NAME: &'static str;

    /// The frame includes `EXC_RETURN`. Set on Mainline cores, where the
    /// value differs from task to task depending on whether the task has used
    /// the FPU, so the trampoline saves it along with the other registers.
    const HAS_EXC_RETURN_SLOT: bool;

    /// The frame includes the entire floating-point register file. Set only
    /// on cores whose hardware doesn't preserve the FP context by itself.
    const HAS_FP_BLOCK: bool;

    /// The offset table.
    const OFFSETS: FrameOffsets = FrameOffsets::new(Self::HAS_EXC_RETURN_SLOT, Self::HAS_FP_BLOCK);

    /// The number of words in the frame.
    const FRAME_WORDS: usize = Self::OFFSETS.len;

    /// Evaluating this fails the build if an implementation supplies an
    /// [`OFFSETS`](Self::OFFSETS) table that isn't well-formed.
    const OFFSETS_VALID: () = assert!(
        Self::OFFSETS.is_well_formed(),
        "the frame offset table has gaps or overlapping slots"
    );
}

/// The frame layout for Armv6-M and Armv8-M Baseline.
#[derive(Debug, Clone, Copy)]
pub enum Baseline {}

impl FrameLayout for Baseline {
    const NAME: &'static str = "Baseline";
    const HAS_EXC_RETURN_SLOT: bool = false;
    const HAS_FP_BLOCK: bool = false;
}

/// The frame layout for Armv7-M, Armv7E-M, and Armv8-M Mainline. Cores with
/// an FPU stack their FP context lazily and only for tasks that have used the
/// FPU, so a new task's frame doesn't contain one.
#[derive(Debug, Clone, Copy)]
pub enum Mainline {}

impl FrameLayout for Mainline {
    const NAME: &'static str = "Mainline";
    const HAS_EXC_RETURN_SLOT: bool = true;
    const HAS_FP_BLOCK: bool = false;
}

/// The frame layout for Mainline cores with an FPU whose automatic FP state
/// preservation is disabled. The switch trampoline saves and restores all
/// FP registers on every context switch.
#[derive(Debug, Clone, Copy)]
pub enum MainlineEagerFp {}

impl FrameLayout for MainlineEagerFp {
    const NAME: &'static str = "MainlineEagerFp";
    const HAS_EXC_RETURN_SLOT: bool = true;
    const HAS_FP_BLOCK: bool = true;
}

/// The frame layout of the current build target.
#[cfg(any(armv6m, armv8m_base))]
pub type Target = Baseline;

/// The frame layout of the current build target.
#[cfg(all(
    not(any(armv6m, armv8m_base)),
    any(not(has_fpu), not(feature = "eager-fp-context"))
))]
pub type Target = Mainline;

/// The frame layout of the current build target.
#[cfg(all(not(any(armv6m, armv8m_base)), has_fpu, feature = "eager-fp-context"))]
pub type Target = MainlineEagerFp;

/// The configuration of the port.
pub trait ThreadingOptions {
    /// The address installed as the link register of every new task. Reached
    /// only if a task's entry point returns. Defaults to
    /// [`task_exit_trampoline`](crate::task_exit_trampoline).
    ///
    /// A kernel typically overrides this to terminate the calling task.
    extern "C" fn exit_task() -> ! {
        crate::task_exit_trampoline()
    }
}
