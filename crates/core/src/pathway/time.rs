use chrono::{DateTime, Duration, Utc};
use pathsim_types::duration;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A random duration drawn from `[from, to)`.
///
/// Delays separate consecutive pathway steps. They're not allowed in historical steps, which
/// carry an explicit `time_from_now` instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delay {
    #[serde(default = "Duration::zero", with = "duration::required")]
    pub from: Duration,
    #[serde(default = "Duration::zero", with = "duration::required")]
    pub to: Duration,
}

impl Delay {
    pub fn new(from: Duration, to: Duration) -> Self {
        Self { from, to }
    }

    /// A delay that always yields `d`.
    pub fn fixed(d: Duration) -> Self {
        Self { from: d, to: d }
    }

    /// Draws a duration in `[from, to)`, or `from` when the interval is empty.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.to <= self.from {
            return self.from;
        }
        match (self.to - self.from).num_nanoseconds() {
            Some(span) if span > 0 => self.from + Duration::nanoseconds(rng.gen_range(0..span)),
            _ => self.from,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.from == self.to
    }
}

/// An integer drawn from `[from, to)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Interval {
    pub from: i64,
    pub to: i64,
}

impl Interval {
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        if self.to <= self.from {
            return self.from;
        }
        rng.gen_range(self.from..self.to)
    }

    pub fn is_empty(&self) -> bool {
        self.from == 0 && self.to == 0
    }
}

/// A point in time given as an absolute instant, an offset from now, or explicitly unrecorded.
///
/// Exactly one of the three forms must be used.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DateTimeSpec {
    pub time: Option<DateTime<Utc>>,
    #[serde(with = "duration::option")]
    pub time_from_now: Option<Duration>,
    pub no_datetime_recorded: bool,
}

impl DateTimeSpec {
    /// Resolves to an absolute instant, or `None` when no time is recorded.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(time) = self.time {
            return Some(time);
        }
        self.time_from_now.map(|offset| now + offset)
    }

    /// Whether the instant lies strictly before `now`. Unrecorded times count as past.
    pub fn is_before(&self, now: DateTime<Utc>) -> bool {
        self.resolve(now).map_or(true, |t| t < now)
    }

    pub fn is_valid(&self) -> bool {
        let provided = [
            self.time.is_some(),
            self.time_from_now.is_some(),
            self.no_datetime_recorded,
        ];
        provided.iter().filter(|set| **set).count() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn delay_draws_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let delay = Delay::new(Duration::seconds(1), Duration::seconds(3));
        for _ in 0..500 {
            let d = delay.random(&mut rng);
            assert!(d >= delay.from && d < delay.to, "{d} out of bounds");
        }
    }

    #[test]
    fn fixed_delay_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        let delay = Delay::fixed(Duration::minutes(5));
        assert_eq!(delay.random(&mut rng), Duration::minutes(5));
    }

    #[test]
    fn delay_decodes_duration_literals() {
        let delay: Delay = serde_yaml::from_str("from: 30m\nto: 1h").expect("valid delay");
        assert_eq!(delay, Delay::new(Duration::minutes(30), Duration::hours(1)));
    }

    #[test]
    fn date_time_requires_exactly_one_form() {
        let now = Utc::now();
        let relative = DateTimeSpec {
            time_from_now: Some(Duration::hours(-1)),
            ..Default::default()
        };
        assert!(relative.is_valid());
        assert!(relative.is_before(now));

        let both = DateTimeSpec {
            time: Some(now),
            no_datetime_recorded: true,
            ..Default::default()
        };
        assert!(!both.is_valid());
        assert!(!DateTimeSpec::default().is_valid());
    }
}
