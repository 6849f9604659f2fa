use std::sync::{OnceLock, RwLock};
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub total_mb: u64,
    pub used_mb: u64,
    pub avail_mb: u64,
}

static SYS: OnceLock<RwLock<System>> = OnceLock::new();

#[inline]
fn sys_handle() -> &'static RwLock<System> {
    SYS.get_or_init(|| {
        RwLock::new(System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
        ))
    })
}

/// System memory snapshot in MiB. A poisoned lock yields zeros.
pub fn memory_stats_mb() -> MemoryStats {
    let Ok(mut sys) = sys_handle().write() else {
        log::debug!("sysinfo lock poisoned; memory stats unavailable");
        return MemoryStats::default();
    };
    sys.refresh_memory();
    // sysinfo returns bytes
    let total_mb = sys.total_memory() / (1024 * 1024);
    let avail_mb = sys.available_memory() / (1024 * 1024);
    let used_mb = total_mb.saturating_sub(avail_mb);
    MemoryStats {
        total_mb,
        used_mb,
        avail_mb,
    }
}
