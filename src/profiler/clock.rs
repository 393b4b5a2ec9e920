//! Monotonic time source for event stamping.

/// Nanoseconds since the monotonic clock's epoch.
///
/// Reads `CLOCK_MONOTONIC`, which is a vDSO call on Linux and never
/// fails for this clock id. The epoch is implementation-defined (boot
/// time on Linux); only differences between readings are meaningful, and
/// snapshots store these raw readings.
pub fn now_nanos() -> i64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid timespec on the stack and CLOCK_MONOTONIC
    // is always available, so the call cannot fail or write out of
    // bounds.
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    ts.tv_sec as i64 * 1_000_000_000 + ts.tv_nsec as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let a = now_nanos();
        let b = now_nanos();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn clock_advances_across_a_sleep() {
        let a = now_nanos();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now_nanos();
        assert!(b - a >= 2_000_000);
    }
}
