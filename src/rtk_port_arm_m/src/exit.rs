/// The default exit trampoline, installed as the link register of a new task
/// unless [`ThreadingOptions::exit_task`](crate::ThreadingOptions::exit_task)
/// is overridden.
///
/// A task's entry point must never return. If it does anyway, it ends up
/// here, and the task parks the processor forever.
pub extern "C" fn task_exit_trampoline() -> ! {
    log::error!("a task returned from its entry point");

    loop {
        #[cfg(target_os = "none")]
        cortex_m::asm::wfi();
        #[cfg(not(target_os = "none"))]
        core::hint::spin_loop();
    }
}
