//! Real-time scheduling helpers (Linux SCHED_FIFO and mlockall).
use std::io;

/// Memory locking mode for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemLock {
    #[default]
    None,
    /// Pages mapped now.
    Current,
    /// Pages mapped now and later.
    All,
}

/// Move the calling thread to SCHED_FIFO at `priority` (1..=99).
pub fn set_current_thread_fifo(priority: i32) -> io::Result<()> {
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    let clamped = priority.clamp(min, max);
    // sched_param has target-specific padding fields on some libcs
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = clamped;
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    Ok(())
}

pub fn lock_memory(mode: MemLock) -> io::Result<()> {
    let flags = match mode {
        MemLock::None => return Ok(()),
        MemLock::Current => libc::MCL_CURRENT,
        MemLock::All => libc::MCL_CURRENT | libc::MCL_FUTURE,
    };
    let rc = unsafe { libc::mlockall(flags) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Human-readable RLIMIT_MEMLOCK, used to explain mlockall failures.
pub fn memlock_limit_hint() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    if cur == libc::RLIM_INFINITY {
        Some("memlock limit: unlimited".to_string())
    } else {
        Some(format!("memlock limit: {} KiB", cur / 1024))
    }
}
