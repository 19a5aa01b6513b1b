mod probe;

pub use probe::HostProbe;
