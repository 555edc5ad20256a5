use std::fmt;
use std::str::FromStr;

/// "YYYY-MM" month identifier with ordering; one archive file per month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8, // 1..=12
}

impl YearMonth {
    pub fn new(year: u16, month: u8) -> Self {
        assert!((1..=12).contains(&month), "Month must be 1..=12");
        Self { year, month }
    }
    pub fn next(self) -> Option<Self> {
        if self.month < 12 {
            Some(Self { year: self.year, month: self.month + 1 })
        } else if self.year < u16::MAX {
            Some(Self { year: self.year + 1, month: 1 })
        } else {
            None
        }
    }
    pub fn prev(self) -> Option<Self> {
        if self.month > 1 {
            Some(Self { year: self.year, month: self.month - 1 })
        } else if self.year > 0 {
            Some(Self { year: self.year - 1, month: 12 })
        } else {
            None
        }
    }

    /// Full English month name plus year, e.g. "March 2010". Used for log lines.
    pub fn long_name(self) -> String {
        match time::Month::try_from(self.month) {
            Ok(m) => format!("{} {}", m, self.year),
            Err(_) => self.to_string(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Accepts `YYYY-MM` and `YYYY-M`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.trim().split('-').collect();
        if parts.len() != 2 || parts[0].len() != 4 {
            return Err(format!("not a valid date: {s} (expected YYYY-MM)"));
        }
        let year: u16 = parts[0].parse().map_err(|_| format!("invalid year in {s}"))?;
        let month: u8 = parts[1].parse().map_err(|_| format!("invalid month in {s}"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("not a valid month: {month}"));
        }
        Ok(Self { year, month })
    }
}

/// Inclusive at both ends; an absent bound is open.
pub fn within_timeframe(ym: YearMonth, from: Option<YearMonth>, to: Option<YearMonth>) -> bool {
    if let Some(lo) = from {
        if ym < lo {
            return false;
        }
    }
    if let Some(hi) = to {
        if ym > hi {
            return false;
        }
    }
    true
}

/// Inclusive iteration from `start` to `end` (if `start` <= `end`), else empty.
pub fn iter_year_months(start: YearMonth, end: YearMonth) -> impl Iterator<Item = YearMonth> {
    let mut curr = if start <= end { Some(start) } else { None };
    std::iter::from_fn(move || {
        let ret = curr?;
        curr = ret.next().filter(|n| *n <= end);
        Some(ret)
    })
}
