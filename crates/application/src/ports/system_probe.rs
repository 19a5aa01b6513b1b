/// Host resource probes consumed by the housekeeper. Every probe is
/// best-effort; `None` means the answer is unavailable on this system.
pub trait SystemProbe: Send + Sync {
    /// 1, 5 and 15 minute load averages.
    fn loadavg(&self) -> Option<[f64; 3]>;

    fn nprocs(&self) -> usize;

    /// Percentage used of the filesystem holding `path`.
    fn disk_usage_percent(&self, path: &str) -> Option<u8>;

    /// Whether both paths live on the same device. Advisory; callers probe
    /// both paths when the answer is unavailable.
    fn same_device(&self, a: &str, b: &str) -> Option<bool>;

    /// Total CPU busy fraction since the previous call, in [0, 1].
    fn cpu_busy_fraction(&self) -> Option<f64>;
}
