//! Real-time setup for `stream --rt` (Linux mlockall; push thread priority is
//! applied by the controller).

use crate::cli::RtLock;

#[cfg(all(feature = "rt", target_os = "linux"))]
pub fn setup_rt_once(lock: RtLock) {
    use jr3_core::rt::{MemLock, lock_memory, memlock_limit_hint};
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        let mode = match lock {
            RtLock::None => MemLock::None,
            RtLock::Current => MemLock::Current,
            RtLock::All => MemLock::All,
        };
        match lock_memory(mode) {
            Ok(()) => tracing::info!(?lock, "process memory locked"),
            Err(e) => tracing::warn!(
                error = %e,
                hint = memlock_limit_hint().unwrap_or_default(),
                "mlockall failed; continuing without memory locking"
            ),
        }
    });
}

#[cfg(not(all(feature = "rt", target_os = "linux")))]
pub fn setup_rt_once(lock: RtLock) {
    tracing::warn!(?lock, "real-time mode requested but this build has no rt support");
}
