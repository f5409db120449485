use rand::Rng;
use std::time::Duration;

/// Exponential reconnect delay with jitter taken off the base.
///
/// Each delay lies in `[base * (1 - jitter), base]` and never below the
/// previous base, so delays do not shrink while the base is still growing.
/// Once the base sits at the cap, delays keep spreading below it.
#[derive(Clone, Debug)]
pub(crate) struct Backoff {
    floor: Duration,
    cap: Duration,
    jitter: f64,
    current: Duration,
    previous: Option<Duration>,
}

impl Backoff {
    pub(crate) fn new(floor: Duration, cap: Duration, jitter: f64) -> Self {
        let cap = cap.max(floor);
        Self {
            floor,
            cap,
            jitter: jitter.clamp(0.0, 0.99),
            current: floor,
            previous: None,
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let mut rng = rand::thread_rng();
        self.next_delay_with(&mut rng)
    }

    pub(crate) fn next_delay_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let base = self.current;
        let lowest = base.mul_f64(1.0 - self.jitter);
        let lower = match self.previous {
            Some(previous) if previous < base => lowest.max(previous),
            Some(_) => lowest,
            None => base,
        };
        self.previous = Some(base);
        self.current = base.saturating_mul(2).min(self.cap);
        if lower >= base {
            return base;
        }
        lower + (base - lower).mul_f64(rng.gen::<f64>())
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.floor;
        self.previous = None;
    }
}
