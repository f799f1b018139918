//! # Real-time thread priorities.
//!
//! Maps a [`Priority`] band onto `SCHED_FIFO` for the calling thread. Needs
//! `CAP_SYS_NICE` (or root) on Linux; the supervisor treats failure as a
//! degraded start, never as fatal.

use crate::messaging::Priority;

/// Switches the calling thread to `SCHED_FIFO` at `priority.rt_value()`.
#[cfg(target_os = "linux")]
pub fn apply_realtime(priority: Priority) -> std::io::Result<()> {
    // SAFETY: `sched_param` is plain old data; all-zero is a valid value on
    // every libc, including those with extra padding fields.
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = priority.rt_value();
    // SAFETY: `pthread_self` always names the calling thread and `param` lives
    // for the duration of the call.
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::from_raw_os_error(rc))
    }
}

/// Real-time priorities are only wired up on Linux.
#[cfg(not(target_os = "linux"))]
pub fn apply_realtime(_priority: Priority) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "SCHED_FIFO is only supported on linux",
    ))
}
