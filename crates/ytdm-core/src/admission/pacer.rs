//! Launch pacing: escalating, jittered cool-downs and fixed spacing.

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Multiplier applied to the base cool-down for the `launch`-th launch
/// (1-based): x1 up to 3 launches, x2 up to 6, x3 up to 10, x5 beyond.
pub fn escalation_factor(launch: u32) -> u32 {
    match launch {
        0..=3 => 1,
        4..=6 => 2,
        7..=10 => 3,
        _ => 5,
    }
}

/// Base interval plus symmetric relative jitter.
#[derive(Debug, Clone, Copy)]
pub struct CooldownPolicy {
    pub base: Duration,
    pub jitter: f64,
}

impl CooldownPolicy {
    /// Cool-down before jitter for the `launch`-th launch.
    pub fn nominal(&self, launch: u32) -> Duration {
        self.base.saturating_mul(escalation_factor(launch))
    }

    /// Cool-down for the `launch`-th launch, randomized within
    /// `nominal * (1 +/- jitter)`.
    pub fn sample<R: Rng + ?Sized>(&self, launch: u32, rng: &mut R) -> Duration {
        let nominal = self.nominal(launch);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || nominal.is_zero() {
            return nominal;
        }
        let factor = rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
        nominal.mul_f64(factor)
    }
}

/// Tracks launches for the escalating cool-down.
#[derive(Debug)]
pub struct LaunchPacer {
    policy: CooldownPolicy,
    last: Option<Instant>,
    launches: u32,
}

impl LaunchPacer {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            policy,
            last: None,
            launches: 0,
        }
    }

    /// Counts the next launch and returns its number and how long to wait
    /// (zero if the cool-down already elapsed, or for the very first launch).
    pub fn next_wait<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> (u32, Duration) {
        self.launches = self.launches.saturating_add(1);
        let cooldown = self.policy.sample(self.launches, rng);
        let wait = match self.last {
            Some(last) => cooldown.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        };
        (self.launches, wait)
    }

    /// Records the instant the launch actually proceeded.
    pub fn mark(&mut self, at: Instant) {
        self.last = Some(at);
    }

    #[cfg(test)]
    fn launches(&self) -> u32 {
        self.launches
    }
}

/// Fixed minimum spacing between operations (metadata lookups).
#[derive(Debug)]
pub struct SpacingPacer {
    spacing: Duration,
    last: Option<Instant>,
}

impl SpacingPacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last: None,
        }
    }

    pub fn next_wait(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => self
                .spacing
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn mark(&mut self, at: Instant) {
        self.last = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BASE: Duration = Duration::from_secs(8);

    #[test]
    fn escalation_steps() {
        let factors: Vec<u32> = (1..=12).map(escalation_factor).collect();
        assert_eq!(factors, vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 3, 5, 5]);
    }

    #[test]
    fn sampled_cooldown_stays_in_band() {
        let policy = CooldownPolicy {
            base: BASE,
            jitter: 0.25,
        };
        let mut rng = StdRng::seed_from_u64(7);
        for launch in 1..=15 {
            let nominal = BASE * escalation_factor(launch);
            for _ in 0..50 {
                let d = policy.sample(launch, &mut rng);
                assert!(d >= nominal.mul_f64(0.75), "launch {launch}: {d:?} too short");
                assert!(d <= nominal.mul_f64(1.25), "launch {launch}: {d:?} too long");
            }
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let policy = CooldownPolicy {
            base: BASE,
            jitter: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.sample(5, &mut rng), BASE * 2);
    }

    #[test]
    fn first_launch_does_not_wait() {
        let mut pacer = LaunchPacer::new(CooldownPolicy {
            base: BASE,
            jitter: 0.25,
        });
        let mut rng = StdRng::seed_from_u64(3);
        let (n, wait) = pacer.next_wait(Instant::now(), &mut rng);
        assert_eq!(n, 1);
        assert_eq!(wait, Duration::ZERO);
    }

    #[test]
    fn wait_accounts_for_elapsed_time() {
        let mut pacer = LaunchPacer::new(CooldownPolicy {
            base: BASE,
            jitter: 0.0,
        });
        let mut rng = StdRng::seed_from_u64(3);
        let start = Instant::now();
        pacer.next_wait(start, &mut rng);
        pacer.mark(start);

        let (n, wait) = pacer.next_wait(start + Duration::from_secs(3), &mut rng);
        assert_eq!(n, 2);
        assert_eq!(wait, Duration::from_secs(5));
        pacer.mark(start + Duration::from_secs(8));

        // Third launch long after the cool-down: no wait.
        let (_, wait) = pacer.next_wait(start + Duration::from_secs(60), &mut rng);
        assert_eq!(wait, Duration::ZERO);
        pacer.mark(start + Duration::from_secs(60));

        // Fourth launch escalates to x2.
        let (n, wait) = pacer.next_wait(start + Duration::from_secs(60), &mut rng);
        assert_eq!(n, 4);
        assert_eq!(wait, BASE * 2);
        assert_eq!(pacer.launches(), 4);
    }

    #[test]
    fn spacing_pacer() {
        let mut pacer = SpacingPacer::new(BASE);
        let start = Instant::now();
        assert_eq!(pacer.next_wait(start), Duration::ZERO);
        pacer.mark(start);
        assert_eq!(pacer.next_wait(start + Duration::from_secs(2)), Duration::from_secs(6));
        assert_eq!(pacer.next_wait(start + Duration::from_secs(20)), Duration::ZERO);
    }
}
