use std::time::{Duration, Instant};

/// Below this distance to the deadline the pacer spins instead of sleeping.
/// OS sleeps overshoot by up to a millisecond or two on most platforms.
const DEFAULT_SPIN_WINDOW: Duration = Duration::from_millis(2);

/// Fixed-cadence frame pacer using deadline accumulation.
///
/// Each deadline is the previous deadline plus one period, never "now plus
/// one period", so a late tick does not push every later tick back. When the
/// caller falls behind, `wait_for_next_tick` returns immediately until the
/// schedule has caught up and the average rate converges on the target.
pub struct FramePacer {
    target_fps: f64,
    period: Duration,
    next_deadline: Instant,
    spin_window: Duration,
    ticks: u64,
    late_ticks: u64,
}

impl FramePacer {
    /// Pacer whose first deadline is one period from now.
    pub fn new(fps: f64) -> Self {
        Self::starting_at(fps, Instant::now())
    }

    pub fn starting_at(fps: f64, start: Instant) -> Self {
        let period = Duration::from_secs_f64(1.0 / fps);
        Self {
            target_fps: fps,
            period,
            next_deadline: start + period,
            spin_window: DEFAULT_SPIN_WINDOW,
            ticks: 0,
            late_ticks: 0,
        }
    }

    /// Pure busy-wait, the most precise and most CPU hungry setting.
    pub fn with_spin_window(mut self, spin_window: Duration) -> Self {
        self.spin_window = spin_window;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until the current deadline has passed, then advance it by one period.
    ///
    /// Sleeps coarsely while the deadline is far away and busy-polls the
    /// monotonic clock for the last `spin_window`.
    pub fn wait_for_next_tick(&mut self) {
        let mut now = Instant::now();
        if now >= self.next_deadline {
            self.late_ticks += 1;
        }
        while now < self.next_deadline {
            let remaining = self.next_deadline - now;
            if remaining > self.spin_window {
                std::thread::sleep(remaining - self.spin_window);
            } else {
                std::hint::spin_loop();
            }
            now = Instant::now();
        }

        self.next_deadline += self.period;
        self.ticks += 1;
    }

    pub fn stats(&self) -> PacerStats {
        PacerStats {
            ticks: self.ticks,
            late_ticks: self.late_ticks,
            target_fps: self.target_fps,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PacerStats {
    pub ticks: u64,
    /// Ticks whose deadline had already passed when the caller arrived.
    pub late_ticks: u64,
    pub target_fps: f64,
}

impl PacerStats {
    pub fn effective_fps(&self, elapsed: Duration) -> f64 {
        if elapsed.as_secs_f64() > 0.0 {
            self.ticks as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_rate_converges() {
        let start = Instant::now();
        let mut pacer = FramePacer::starting_at(100.0, start);
        for _ in 0..50 {
            pacer.wait_for_next_tick();
        }
        let elapsed = start.elapsed();
        // 50 ticks at 100 Hz end at the 500 ms deadline.
        assert!(elapsed >= Duration::from_millis(500), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(650), "{:?}", elapsed);
        assert_eq!(pacer.stats().ticks, 50);
    }

    #[test]
    fn test_late_caller_catches_up_without_drift() {
        let start = Instant::now();
        let mut pacer = FramePacer::starting_at(50.0, start);
        // Stall for five periods, then tick ten times.
        std::thread::sleep(Duration::from_millis(100));
        for _ in 0..10 {
            pacer.wait_for_next_tick();
        }
        let elapsed = start.elapsed();
        // Deadline of the 10th tick is 200 ms after start regardless of the stall.
        assert!(elapsed >= Duration::from_millis(200), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(300), "{:?}", elapsed);
        assert!(pacer.stats().late_ticks >= 4);
    }

    #[test]
    fn test_pure_spin_still_paces() {
        let start = Instant::now();
        let mut pacer = FramePacer::starting_at(200.0, start).with_spin_window(Duration::MAX);
        for _ in 0..10 {
            pacer.wait_for_next_tick();
        }
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_effective_fps() {
        let stats = PacerStats {
            ticks: 50,
            late_ticks: 0,
            target_fps: 25.0,
        };
        assert_eq!(stats.effective_fps(Duration::from_secs(2)), 25.0);
        assert_eq!(stats.effective_fps(Duration::ZERO), 0.0);
    }
}
