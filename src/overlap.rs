use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::error::EngineError;
use crate::models::WorkInterval;

/// Assumed overlap when the dates cannot be trusted.
pub const FALLBACK_BOTH_CURRENT: u32 = 24;
pub const FALLBACK_ONE_CURRENT: u32 = 12;
pub const FALLBACK_UNDATED: u32 = 6;

/// Shortest shared stint that makes a review relationship valid.
pub const MIN_SHARED_MONTHS: u32 = 1;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Calendar point with month resolution. `month0` is 0 for January.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthPoint {
    pub year: i32,
    pub month0: u32,
}

impl MonthPoint {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    fn index(&self) -> i64 {
        self.year as i64 * 12 + self.month0 as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedStint {
    pub company_name: String,
    pub months: u32,
}

/// Parse "Mon YYYY" or "YYYY". Unknown month prefixes fall back to January;
/// a bad year is an error.
pub fn parse_month_point(raw: &str) -> Result<MonthPoint, EngineError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let (month_token, year_token) = match tokens.as_slice() {
        [year] => (None, *year),
        [month, year] => (Some(*month), *year),
        _ => return Err(EngineError::MalformedDateInput(raw.to_string())),
    };

    let year: i32 = year_token
        .parse()
        .map_err(|_| EngineError::MalformedDateInput(raw.to_string()))?;

    let month0 = month_token
        .map(|token| {
            let prefix: String = token.to_lowercase().chars().take(3).collect();
            MONTHS
                .iter()
                .position(|name| *name == prefix)
                .unwrap_or(0) as u32
        })
        .unwrap_or(0);

    Ok(MonthPoint { year, month0 })
}

fn endpoint(raw: Option<&str>) -> Option<MonthPoint> {
    let raw = raw?;
    match parse_month_point(raw) {
        Ok(point) => Some(point),
        Err(err) => {
            debug!(error = %err, "work history date ignored");
            None
        }
    }
}

fn resolve(interval: &WorkInterval, today: MonthPoint) -> Option<(MonthPoint, MonthPoint)> {
    let start = endpoint(interval.start_date.as_deref())?;
    let end = if interval.is_current {
        today
    } else {
        endpoint(interval.end_date.as_deref())?
    };
    Some((start, end))
}

/// Whole months two stints overlap, counting both boundary months.
///
/// Intervals with missing or unreadable dates get a heuristic instead of an
/// error: 24 months if both people are still there, 12 if one is, 6 otherwise.
pub fn estimate_overlap_months(a: &WorkInterval, b: &WorkInterval, today: NaiveDate) -> u32 {
    let now = MonthPoint::from_date(today);

    match (resolve(a, now), resolve(b, now)) {
        (Some((a_start, a_end)), Some((b_start, b_end))) => {
            let start = a_start.max(b_start);
            let end = a_end.min(b_end);
            if end < start {
                return 0;
            }
            (end.index() - start.index() + 1).max(0) as u32
        }
        _ => match (a.is_current, b.is_current) {
            (true, true) => FALLBACK_BOTH_CURRENT,
            (true, false) | (false, true) => FALLBACK_ONE_CURRENT,
            (false, false) => FALLBACK_UNDATED,
        },
    }
}

fn same_company(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
}

/// Longest overlap between any two stints at the same company.
pub fn shared_employment(
    a_history: &[WorkInterval],
    b_history: &[WorkInterval],
    today: NaiveDate,
) -> Option<SharedStint> {
    let mut best: Option<SharedStint> = None;

    for a in a_history {
        for b in b_history {
            if !same_company(&a.company_name, &b.company_name) {
                continue;
            }
            let months = estimate_overlap_months(a, b, today);
            if months < MIN_SHARED_MONTHS {
                continue;
            }
            let better = match &best {
                None => true,
                Some(current) => {
                    months > current.months
                        || (months == current.months
                            && a.company_name.trim().to_lowercase()
                                < current.company_name.to_lowercase())
                }
            };
            if better {
                best = Some(SharedStint {
                    company_name: a.company_name.trim().to_string(),
                    months,
                });
            }
        }
    }

    best
}
