mod monotonic_clock;

pub use monotonic_clock::MonotonicClock;
