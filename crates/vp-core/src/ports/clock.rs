/// Monotonic time source in milliseconds.
///
/// Only differences between readings are meaningful; session expiry is
/// computed from them.
pub trait ClockPort: Send + Sync {
    fn now_ms(&self) -> i64;
}
