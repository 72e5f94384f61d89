//! Builds initial frames through the public API the way a kernel's task
//! creation code would, and checks what the context switcher would pop.
use rtk_port_arm_m::{
    poison_slots, read_frame, stack_bottom_empty, stack_top, write_initial_frame, Baseline,
    FrameLayout, InitialContext, Mainline, MainlineEagerFp, StackRegion, TaskStack, Word,
};

const STACK_WORDS: usize = 64;

#[test]
fn stack_bounds_of_example_region() {
    let low = 0x2000_0000 as *mut Word;
    let top = stack_top(low, STACK_WORDS);
    // 0x40 words above the low address
    assert_eq!(top as usize, 0x2000_0000 + 0x40 * 4);
    assert_eq!(stack_bottom_empty(top, STACK_WORDS), low);
    assert_eq!(StackRegion::new(low, STACK_WORDS).top(), top);
}

fn example_frame<L: FrameLayout>() {
    let mut stack = [0 as Word; STACK_WORDS];
    let top = stack_top(stack.as_mut_ptr(), STACK_WORDS);
    let ctx = InitialContext {
        entry_point: 0x0800_1000,
        exit_trampoline: 0x0800_0f01,
        param: 0xcafe_babe,
    };

    let sp = unsafe { write_initial_frame::<L>(top, STACK_WORDS, &ctx) };
    assert_eq!(sp, top.wrapping_sub(L::FRAME_WORDS));

    // Read forward from the returned stack pointer
    let start = STACK_WORDS - L::FRAME_WORDS;
    let words = &stack[start..];
    let o = L::OFFSETS;

    // r4-r11 first
    assert_eq!(o.r4, 0);
    for (i, pattern) in poison_slots::<L>().filter(|&(i, _)| i < 8) {
        assert_eq!(words[i], pattern);
    }

    // Then the optional blocks, then the exception frame
    let mut i = 8;
    if L::HAS_EXC_RETURN_SLOT {
        assert_eq!(words[i], 0xffff_fffd);
        i += 1;
    }
    if L::HAS_FP_BLOCK {
        i += 33;
    }
    assert_eq!(i, o.r0);
    assert_eq!(
        &words[i..],
        &[
            0xcafe_babe,
            0xa5a5_0101,
            0xa5a5_0202,
            0xa5a5_0303,
            0xa5a5_1212,
            0x0800_0f01,
            0x0800_1000,
            0x0100_0000,
        ]
    );

    // Nothing below the frame was touched
    assert!(stack[..start].iter().all(|&w| w == 0));

    let view = unsafe { read_frame::<L>(sp) };
    assert_eq!(view.pc, 0x0800_1000);
    assert_eq!(view.lr, 0x0800_0f01);
    assert_eq!(view.r0_r3[0], 0xcafe_babe);
}

#[test]
fn example_frame_baseline() {
    example_frame::<Baseline>();
}

#[test]
fn example_frame_mainline() {
    example_frame::<Mainline>();
}

#[test]
fn example_frame_mainline_eager_fp() {
    example_frame::<MainlineEagerFp>();
}

static TASK_STACK: TaskStack<STACK_WORDS> = TaskStack::new();

#[test]
fn static_task_stack() {
    let region = TASK_STACK.region();
    assert!(region.fits_frame::<MainlineEagerFp>());
    assert_eq!(region.top() as usize % 8, 0);

    let ctx = InitialContext {
        entry_point: 0x0800_1000,
        exit_trampoline: 0x0800_0f01,
        param: 1,
    };
    let sp = unsafe { write_initial_frame::<Mainline>(region.top(), region.size_words(), &ctx) };
    assert!(region.contains(sp));
    assert_eq!(
        region.top() as usize - sp as usize,
        Mainline::FRAME_WORDS * 4
    );
}
