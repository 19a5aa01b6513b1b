use std::ffi::CString;
use std::mem::MaybeUninit;
use std::sync::Mutex;
use vigil_dns_application::ports::SystemProbe;

/// Resource probes backed by the host: `getloadavg(3)`, `statvfs(3)`,
/// `stat(2)` and `/proc/stat`.
pub struct HostProbe {
    prev_cpu: Mutex<Option<(u64, u64)>>,
}

impl HostProbe {
    pub fn new() -> Self {
        Self {
            prev_cpu: Mutex::new(None),
        }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for HostProbe {
    fn loadavg(&self) -> Option<[f64; 3]> {
        let mut load = [0f64; 3];
        let n = unsafe { libc::getloadavg(load.as_mut_ptr(), 3) };
        if n == 3 {
            Some(load)
        } else {
            None
        }
    }

    fn nprocs(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    fn disk_usage_percent(&self, path: &str) -> Option<u8> {
        let c_path = CString::new(path).ok()?;
        let mut stats = MaybeUninit::<libc::statvfs>::uninit();
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), stats.as_mut_ptr()) };
        if rc != 0 {
            return None;
        }
        let stats = unsafe { stats.assume_init() };
        if stats.f_blocks == 0 {
            return None;
        }
        let used = stats.f_blocks.saturating_sub(stats.f_bavail);
        Some(((used as f64 / stats.f_blocks as f64) * 100.0).round() as u8)
    }

    fn same_device(&self, a: &str, b: &str) -> Option<bool> {
        Some(device_of(a)? == device_of(b)?)
    }

    fn cpu_busy_fraction(&self) -> Option<f64> {
        let line = std::fs::read_to_string("/proc/stat").ok()?;
        let first = line.lines().next()?;
        let mut fields = first.split_whitespace();
        if fields.next()? != "cpu" {
            return None;
        }
        let values: Vec<u64> = fields.filter_map(|f| f.parse().ok()).collect();
        if values.len() < 4 {
            return None;
        }
        let idle = values[3] + values.get(4).copied().unwrap_or(0);
        let total: u64 = values.iter().sum();

        let mut prev = self.prev_cpu.lock().unwrap_or_else(|p| p.into_inner());
        let fraction = match *prev {
            Some((prev_total, prev_idle)) if total > prev_total => {
                let dt = (total - prev_total) as f64;
                let di = idle.saturating_sub(prev_idle) as f64;
                Some(1.0 - di / dt)
            }
            _ => None,
        };
        *prev = Some((total, idle));
        fraction
    }
}

fn device_of(path: &str) -> Option<u64> {
    let c_path = CString::new(path).ok()?;
    let mut stats = MaybeUninit::<libc::stat>::uninit();
    let rc = unsafe { libc::stat(c_path.as_ptr(), stats.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let stats = unsafe { stats.assume_init() };
    Some(stats.st_dev)
}
