//! Time subsystem.
//!
//! `HostClock` counts seconds since the host started and feeds the `uTime`
//! uniform.

mod host_clock;

pub use host_clock::HostClock;
