use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How often a plan re-runs the invest task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown frequency {0:?} (expected daily, weekly or monthly)")]
pub struct UnknownFrequency(pub String);

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::Daily, Frequency::Weekly, Frequency::Monthly];

    /// Cron expression submitted to the scheduling backend (UTC midnight).
    pub const fn schedule(self) -> &'static str {
        match self {
            Frequency::Daily => "0 0 * * *",
            Frequency::Weekly => "0 0 * * 1",
            Frequency::Monthly => "0 0 1 * *",
        }
    }

    /// Reverse lookup of [`Frequency::schedule`].
    pub fn from_schedule(schedule: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.schedule() == schedule.trim())
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFrequency(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedules_are_distinct_and_reversible() {
        for frequency in Frequency::ALL {
            assert_eq!(Frequency::from_schedule(frequency.schedule()), Some(frequency));
        }
        assert_eq!(Frequency::from_schedule("*/5 * * * *"), None);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Weekly".parse::<Frequency>(), Ok(Frequency::Weekly));
        assert!("hourly".parse::<Frequency>().is_err());
    }
}
