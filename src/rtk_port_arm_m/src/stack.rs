//! Stacks on Arm-M are *full descending*: the stack grows toward lower
//! addresses and the stack pointer points to the most recently pushed word.
//! The initial stack pointer is therefore one past the end of the region.
use core::{cell::UnsafeCell, fmt, mem::MaybeUninit};

use crate::{FrameLayout, Target, Word};

/// Get the initial stack pointer of the stack region starting at
/// `stack_low_address` and spanning `stack_size` words.
///
/// `stack_size` must be non-zero. The calculation wraps on overflow and never
/// dereferences the pointers.
#[inline]
pub const fn stack_top(stack_low_address: *mut Word, stack_size: usize) -> *mut Word {
    stack_low_address.wrapping_add(stack_size)
}

/// Get the low address of the stack region whose initial stack pointer is
/// `stack_top` and whose size is `stack_size` words. The inverse of
/// [`stack_top`].
///
/// A stack pointer below the returned address means the task has overflowed
/// its stack.
#[inline]
pub const fn stack_bottom_empty(stack_top: *mut Word, stack_size: usize) -> *mut Word {
    stack_top.wrapping_sub(stack_size)
}

/// A stack region exclusively owned by one task.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    low: *mut Word,
    size_words: usize,
}

// Safety: `StackRegion` is just an address range. Whoever writes through it is
// responsible for exclusivity.
unsafe impl Send for StackRegion {}
unsafe impl Sync for StackRegion {}

impl fmt::Debug for StackRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackRegion")
            .field("low", &self.low)
            .field("top", &self.top())
            .field("size_words", &self.size_words)
            .finish()
    }
}

impl StackRegion {
    /// Construct a `StackRegion` covering `size_words` words starting at
    /// `low`.
    #[inline]
    pub const fn new(low: *mut Word, size_words: usize) -> Self {
        Self { low, size_words }
    }

    /// Construct a `StackRegion` from its initial stack pointer and size.
    #[inline]
    pub const fn from_top(top: *mut Word, size_words: usize) -> Self {
        Self::new(stack_bottom_empty(top, size_words), size_words)
    }

    #[inline]
    pub const fn low(&self) -> *mut Word {
        self.low
    }

    #[inline]
    pub const fn size_words(&self) -> usize {
        self.size_words
    }

    /// Get the initial stack pointer.
    #[inline]
    pub const fn top(&self) -> *mut Word {
        stack_top(self.low, self.size_words)
    }

    /// Check if a word at `sp` lies within the region, i.e., `sp` is in
    /// `[low, top)`. The top is one past the end and is not part of the
    /// region.
    #[inline]
    pub fn contains(&self, sp: *const Word) -> bool {
        let (low, top) = (self.low as usize, self.top() as usize);
        (low..top).contains(&(sp as usize))
    }

    /// Check if the region can hold the initial context frame of the layout
    /// `L`.
    #[inline]
    pub const fn fits_frame<L: FrameLayout>(&self) -> bool {
        self.size_words >= L::FRAME_WORDS
    }
}

/// Statically allocated stack storage for one task.
///
/// The storage is 8-byte aligned, and `WORDS` must be an even number so that
/// the initial stack pointer is 8-byte aligned as well, as required at
/// exception entry by the AAPCS.
///
/// ```
/// use rtk_port_arm_m::TaskStack;
/// static STACK: TaskStack<64> = TaskStack::new();
/// assert_eq!(STACK.region().size_words(), 64);
/// ```
///
/// Constructing a `TaskStack` that cannot hold [`Target`]'s initial frame is
/// a compile-time error:
///
/// ```compile_fail
/// use rtk_port_arm_m::TaskStack;
/// static STACK: TaskStack<4> = TaskStack::new();
/// ```
#[repr(C, align(8))]
pub struct TaskStack<const WORDS: usize> {
    words: UnsafeCell<[MaybeUninit<Word>; WORDS]>,
}

// Safety: The contents are only ever touched through raw pointers handed out
// by `region`, whose users are responsible for exclusivity.
unsafe impl<const WORDS: usize> Sync for TaskStack<WORDS> {}

impl<const WORDS: usize> TaskStack<WORDS> {
    const VALID_SIZE: () = {
        assert!(WORDS % 2 == 0, "the stack size must be a multiple of 8 bytes");
        assert!(
            WORDS >= <Target as FrameLayout>::FRAME_WORDS,
            "the stack is too small to hold the initial context frame"
        );
    };

    #[allow(clippy::let_unit_value)]
    pub const fn new() -> Self {
        let () = Self::VALID_SIZE;
        Self {
            words: UnsafeCell::new([MaybeUninit::uninit(); WORDS]),
        }
    }

    /// Get the region occupied by this stack.
    #[inline]
    pub const fn region(&self) -> StackRegion {
        StackRegion::new(self.words.get() as *mut Word, WORDS)
    }
}

impl<const WORDS: usize> Default for TaskStack<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{Baseline, Mainline, MainlineEagerFp};
    use quickcheck_macros::quickcheck;
    use std::boxed::Box;

    #[test]
    fn top_is_one_past_the_end() {
        let low = 0x2000_0000 as *mut Word;
        // 64 words = 0x40 words = 0x100 bytes
        assert_eq!(stack_top(low, 64) as usize, 0x2000_0100);
        assert_eq!(stack_bottom_empty(stack_top(low, 64), 64), low);
    }

    #[quickcheck]
    fn round_trip(low: usize, size_words: u16) -> bool {
        let size_words = size_words as usize + 1;
        let low = (low & !3) as *mut Word;
        stack_bottom_empty(stack_top(low, size_words), size_words) == low
    }

    #[quickcheck]
    fn linearity(low: usize, size_words: u16) -> bool {
        let size_words = size_words as usize + 1;
        let low = (low & !3) as *mut Word;
        let top = stack_top(low, size_words);
        (top as usize).wrapping_sub(size_words * 4) == low as usize
    }

    #[test]
    fn region_bounds() {
        let region = StackRegion::new(0x2000_0000 as *mut Word, 16);
        assert_eq!(region.top() as usize, 0x2000_0040);
        assert_eq!(StackRegion::from_top(region.top(), 16), region);

        assert!(region.contains(0x2000_0000 as *const Word));
        assert!(region.contains(0x2000_0020 as *const Word));
        assert!(!region.contains(0x1fff_fffc as *const Word));
        assert!(!region.contains(0x2000_0044 as *const Word));
    }

    /// The region is half-open: the highest word is inside, the top is not.
    #[test]
    fn region_excludes_top() {
        let region = StackRegion::new(0x2000_0000 as *mut Word, 16);
        assert!(region.contains(region.low()));
        assert!(region.contains(region.top().wrapping_sub(1)));
        assert!(!region.contains(region.top()));
        assert!(!region.contains(region.low().wrapping_sub(1)));
    }

    #[test]
    fn region_fits_frame() {
        let region = StackRegion::new(0x2000_0000 as *mut Word, 17);
        assert!(region.fits_frame::<Baseline>());
        assert!(region.fits_frame::<Mainline>());
        assert!(!region.fits_frame::<MainlineEagerFp>());
    }

    #[test]
    fn task_stack_alignment() {
        let stack: Box<TaskStack<64>> = Box::new(TaskStack::new());
        let region = stack.region();
        assert_eq!(region.size_words(), 64);
        assert_eq!(region.low() as usize % 8, 0);
        assert_eq!(region.top() as usize % 8, 0);
        assert_eq!(
            region.top() as usize - region.low() as usize,
            core::mem::size_of::<TaskStack<64>>()
        );
    }
}
