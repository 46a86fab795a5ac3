//! Request quotas as operators write them.
//!
//! `"10 per minute"`, `"100/hour"`, `"200 per day;50 per hour"`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Granularity of a quota window.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WindowUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl WindowUnit {
    fn seconds(self) -> u64 {
        match self {
            WindowUnit::Second => 1,
            WindowUnit::Minute => 60,
            WindowUnit::Hour => 3_600,
            WindowUnit::Day => 86_400,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WindowUnit::Second => "second",
            WindowUnit::Minute => "minute",
            WindowUnit::Hour => "hour",
            WindowUnit::Day => "day",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        let unit = raw.strip_suffix('s').unwrap_or(raw);
        match unit {
            "second" | "sec" => Some(WindowUnit::Second),
            "minute" | "min" => Some(WindowUnit::Minute),
            "hour" => Some(WindowUnit::Hour),
            "day" => Some(WindowUnit::Day),
            _ => None,
        }
    }
}

/// `max_requests` admitted per `multiples` × `unit`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Quota {
    pub max_requests: u32,
    pub multiples: u32,
    pub unit: WindowUnit,
}

impl Quota {
    pub fn new(max_requests: u32, multiples: u32, unit: WindowUnit) -> Self {
        Self {
            max_requests,
            multiples,
            unit,
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, 1, WindowUnit::Minute)
    }

    pub fn per_hour(max_requests: u32) -> Self {
        Self::new(max_requests, 1, WindowUnit::Hour)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.unit.seconds() * u64::from(self.multiples))
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} per {} {}",
            self.max_requests,
            self.multiples,
            self.unit.as_str()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaParseError {
    #[error("empty rate limit")]
    Empty,
    #[error("malformed rate limit {0:?}, expected \"<n> per <unit>\"")]
    Malformed(String),
    #[error("unknown rate limit unit {0:?}")]
    UnknownUnit(String),
    #[error("rate limit {0:?} admits no requests")]
    Zero(String),
}

impl FromStr for Quota {
    type Err = QuotaParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim().to_ascii_lowercase();
        if text.is_empty() {
            return Err(QuotaParseError::Empty);
        }
        let (count, period) = text
            .split_once(" per ")
            .or_else(|| text.split_once('/'))
            .ok_or_else(|| QuotaParseError::Malformed(raw.to_string()))?;

        let max_requests: u32 = count
            .trim()
            .parse()
            .map_err(|_| QuotaParseError::Malformed(raw.to_string()))?;

        let mut parts = period.split_whitespace();
        let (multiples, unit) = match (parts.next(), parts.next(), parts.next()) {
            (Some(unit), None, None) => (1, unit),
            (Some(n), Some(unit), None) => (
                n.parse::<u32>()
                    .map_err(|_| QuotaParseError::Malformed(raw.to_string()))?,
                unit,
            ),
            _ => return Err(QuotaParseError::Malformed(raw.to_string())),
        };
        let unit =
            WindowUnit::parse(unit).ok_or_else(|| QuotaParseError::UnknownUnit(unit.to_string()))?;

        if max_requests == 0 || multiples == 0 {
            return Err(QuotaParseError::Zero(raw.to_string()));
        }
        Ok(Quota::new(max_requests, multiples, unit))
    }
}

/// Parse a `;` or `,` separated list of quotas.
pub fn parse_quotas(raw: &str) -> Result<Vec<Quota>, QuotaParseError> {
    let quotas = raw
        .split([';', ','])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Quota::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    if quotas.is_empty() {
        return Err(QuotaParseError::Empty);
    }
    Ok(quotas)
}
