use std::time::Duration;

const DEFAULT_INITIAL: Duration = Duration::from_secs(2);
const DEFAULT_MULTIPLIER: f64 = 1.5;
const DEFAULT_CEILING: Duration = Duration::from_secs(10);
const DEFAULT_BUDGET: Duration = Duration::from_secs(180);
const DEFAULT_FINAL_WINDOW: Duration = Duration::from_secs(5);

/// Exponential backoff with a ceiling and a total wall-clock budget.
///
/// No jitter: the scanner is a single endpoint, not a shared resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub ceiling: Duration,
    /// Total time the poll loop may spend on one job.
    pub budget: Duration,
    /// Transient errors this close to the deadline end polling.
    pub final_window: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::long()
    }
}

impl BackoffPolicy {
    /// Quick interactive scans.
    pub fn short() -> Self {
        Self {
            budget: Duration::from_secs(120),
            ..Self::long()
        }
    }

    pub fn long() -> Self {
        Self {
            initial: DEFAULT_INITIAL,
            multiplier: DEFAULT_MULTIPLIER,
            ceiling: DEFAULT_CEILING,
            budget: DEFAULT_BUDGET,
            final_window: DEFAULT_FINAL_WINDOW,
        }
    }

    pub fn with_initial(mut self, initial: Duration) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn with_final_window(mut self, final_window: Duration) -> Self {
        self.final_window = final_window;
        self
    }

    pub fn schedule(&self) -> Backoff {
        Backoff {
            next: self.initial.min(self.ceiling),
            multiplier: self.multiplier.max(1.0),
            ceiling: self.ceiling,
        }
    }
}

/// Endless sequence of sleep intervals produced by a [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    multiplier: f64,
    ceiling: Duration,
}

impl Backoff {
    pub fn peek(&self) -> Duration {
        self.next
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current.mul_f64(self.multiplier).min(self.ceiling);
        Some(current)
    }
}
