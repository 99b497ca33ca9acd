//! Link-time symbols the embassy crates expect on ESP-IDF.
//!
//! - `critical-section` 1.x: the line channel's `CriticalSectionRawMutex`
//!   needs `_critical_section_1_0_acquire/release`. Backed by one global
//!   std mutex, re-entrant per thread through a depth counter.
//! - `embassy-time`: `_embassy_time_now` (the `SystemClock` adapter reads
//!   it) and `_embassy_time_schedule_wake` for any timer future.
//!
//! Host builds get `critical-section/std` from dev-dependencies and never
//! touch the embassy time driver.

#[cfg(target_os = "espidf")]
mod espidf {
    use core::cell::{Cell, RefCell};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static SECTION: Mutex<()> = Mutex::new(());

    thread_local! {
        static DEPTH: Cell<u8> = const { Cell::new(0) };
        static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
        let depth = DEPTH.get();
        if depth == 0 {
            let guard = SECTION.lock().unwrap_or_else(PoisonError::into_inner);
            HELD.with_borrow_mut(|held| *held = Some(guard));
        }
        DEPTH.set(depth.saturating_add(1));
        depth
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _critical_section_1_0_release(_restore: u8) {
        match DEPTH.get() {
            0 => {}
            1 => {
                DEPTH.set(0);
                HELD.with_borrow_mut(|held| *held = None);
            }
            d => DEPTH.set(d - 1),
        }
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _embassy_time_now() -> u64 {
        // SAFETY: esp_timer is running before `main`; the call has no
        // preconditions.
        unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _embassy_time_schedule_wake(at: u64, waker: *mut core::ffi::c_void) {
        if waker.is_null() {
            return;
        }
        // SAFETY: embassy-time hands over a live `&Waker` for the duration
        // of the call; it is cloned before returning.
        let waker = unsafe { (*waker.cast::<core::task::Waker>()).clone() };
        let spawned = std::thread::Builder::new()
            .stack_size(2048)
            .spawn(move || {
                let now = _embassy_time_now();
                if at > now {
                    std::thread::sleep(core::time::Duration::from_micros(at - now));
                }
                waker.wake();
            });
        if spawned.is_err() {
            log::warn!("time: wake thread spawn failed");
        }
    }
}
