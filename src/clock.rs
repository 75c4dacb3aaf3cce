/// Source of wall-clock time in milliseconds since the Unix epoch.
///
/// `std::time::SystemTime::now` panics on `wasm32-unknown-unknown`, so
/// everything that needs "now" goes through this trait instead.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Clock backed by the Workers runtime `Date`.
pub struct WorkerClock;

impl Clock for WorkerClock {
    fn now_ms(&self) -> u64 {
        worker::Date::now().as_millis()
    }
}

#[cfg(test)]
pub use self::manual::ManualClock;
