//! Cron expression parsing and timezone-aware next-run calculation.
//!
//! Accepts standard five-field expressions (`minute hour day month weekday`),
//! six-field expressions with a leading seconds field, and the usual
//! `@daily`-style shortcuts. Day-of-week numbers follow standard cron:
//! 0 and 7 are Sunday, 1 is Monday.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use agenthub_core::error::AppError;
use agenthub_core::result::AppResult;

/// A parsed cron expression bound to a timezone
#[derive(Clone)]
pub struct CronExpression {
    expression: String,
    timezone: Tz,
    schedule: ::cron::Schedule,
}

impl fmt::Debug for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronExpression")
            .field("expression", &self.expression)
            .field("timezone", &self.timezone.name())
            .finish()
    }
}

impl CronExpression {
    /// Parse `expression`, evaluated in the IANA `timezone`.
    ///
    /// Fails with a validation error for malformed expressions or unknown
    /// timezones.
    pub fn parse(expression: &str, timezone: &str) -> AppResult<Self> {
        let timezone: Tz = timezone
            .trim()
            .parse()
            .map_err(|_| AppError::validation(format!("Unknown timezone '{timezone}'")))?;

        let normalized = normalize(expression)?;
        let schedule = ::cron::Schedule::from_str(&normalized).map_err(|e| {
            AppError::validation(format!("Invalid cron expression '{expression}': {e}"))
        })?;

        Ok(Self {
            expression: expression.trim().to_string(),
            timezone,
            schedule,
        })
    }

    /// The expression as supplied
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Timezone name
    pub fn timezone(&self) -> &str {
        self.timezone.name()
    }

    /// First firing time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.timezone))
            .next()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// First `count` firing times strictly after `after`
    pub fn upcoming(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.timezone))
            .take(count)
            .map(|dt| dt.with_timezone(&Utc))
            .collect()
    }
}

/// Expand shortcuts and prepend a seconds field to five-field expressions
fn normalize(expression: &str) -> AppResult<String> {
    let trimmed = expression.trim();

    if trimmed.starts_with('@') {
        let expanded = match trimmed.to_ascii_lowercase().as_str() {
            "@yearly" | "@annually" => "0 0 0 1 1 *",
            "@monthly" => "0 0 0 1 * *",
            "@weekly" => "0 0 0 * * Sun",
            "@daily" | "@midnight" => "0 0 0 * * *",
            "@hourly" => "0 0 * * * *",
            _ => {
                return Err(AppError::validation(format!(
                    "Unknown cron shortcut '{trimmed}'"
                )));
            }
        };
        return Ok(expanded.to_string());
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!(
            "0 {} {}",
            fields[..4].join(" "),
            day_of_week(fields[4])?
        )),
        6 => Ok(format!("{} {}", fields[..5].join(" "), day_of_week(fields[5])?)),
        n => Err(AppError::validation(format!(
            "Invalid cron expression '{trimmed}': expected 5 or 6 fields, got {n}"
        ))),
    }
}

/// Day names in the order of standard cron numbering (0 = Sunday)
const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Rewrite a standard day-of-week field (0 or 7 = Sunday, 1 = Monday) into
/// an explicit list of day names.
///
/// The `cron` crate numbers days from 1 = Sunday, so numeric values are never
/// passed through.
fn day_of_week(field: &str) -> AppResult<String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let invalid = |reason: &str| {
        AppError::validation(format!("Invalid day-of-week field '{field}': {reason}"))
    };

    let mut days = [false; 7];
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: usize = step
                    .parse()
                    .map_err(|_| invalid(&format!("bad step '{step}'")))?;
                if step == 0 {
                    return Err(invalid("step must be positive"));
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let (start, end) = if range == "*" || range == "?" {
            (0, 6)
        } else if let Some((start, end)) = range.split_once('-') {
            (
                day_number(start).ok_or_else(|| invalid(start))?,
                day_number(end).ok_or_else(|| invalid(end))?,
            )
        } else {
            let day = day_number(range).ok_or_else(|| invalid(range))?;
            // `N/step` runs to the end of the week
            (day, if step.is_some() { 6 } else { day })
        };
        if start > end {
            return Err(invalid(&format!("range {start}-{end} is reversed")));
        }

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days[day % 7] = true;
        }
    }

    let names: Vec<&str> = DAY_NAMES
        .iter()
        .zip(days)
        .filter_map(|(name, set)| set.then_some(*name))
        .collect();
    Ok(names.join(","))
}

/// Parse a single day token: `0`-`7` or a three-letter day name
fn day_number(token: &str) -> Option<usize> {
    if let Ok(n) = token.parse::<usize>() {
        return (n <= 7).then_some(n);
    }
    DAY_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
}
