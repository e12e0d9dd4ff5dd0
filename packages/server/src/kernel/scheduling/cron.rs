//! Cron Expander.
//!
//! Pure function: given a cron expression, a start instant, and an end
//! instant, produces the finite ordered sequence of Unix timestamps at
//! which the expression fires within `(from, to]`. Deterministic; UTC only.
//!
//! Dialect: standard 5-field (`minute hour dom month dow`). Only `*`,
//! literal, `a-b`, `a,b,c`, and `*/N` are accepted — no `L`, `W`, `#`, or
//! named months/weekdays.

use chrono::{DateTime, Utc};
use std::str::FromStr;

use super::error::{Result, SchedulingError};

const ALLOWED_FIELD_CHARS: &str = "0123456789*,-/";

/// Validates that a single cron field only uses the operators this dialect
/// supports. The underlying `cron` crate is more permissive (it accepts
/// `L`/`W`/`#` and named months/weekdays); we reject those explicitly so an
/// expression that "parses" here always means what this dialect accepts.
fn validate_field(field: &str) -> bool {
    !field.is_empty() && field.chars().all(|c| ALLOWED_FIELD_CHARS.contains(c))
}

fn validate_dialect(expression: &str) -> Result<()> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(SchedulingError::InvalidCronExpression(
            expression.to_string(),
        ));
    }
    if !fields.iter().all(|f| validate_field(f)) {
        return Err(SchedulingError::InvalidCronExpression(
            expression.to_string(),
        ));
    }
    Ok(())
}

/// Expands `expression` into every firing strictly greater than
/// `from_exclusive` and less than or equal to `to_inclusive`, as Unix
/// seconds. Fails with [`SchedulingError::InvalidCronExpression`] when the
/// expression is not parseable under the supported dialect.
pub fn expand(
    expression: &str,
    from_exclusive: DateTime<Utc>,
    to_inclusive: DateTime<Utc>,
) -> Result<Vec<i64>> {
    validate_dialect(expression)?;

    // The `cron` crate expects a leading seconds field; spec's dialect has
    // zero seconds precision within the fired minute, so we pin it to "0".
    let six_field = format!("0 {expression}");
    let schedule = cron::Schedule::from_str(&six_field)
        .map_err(|_| SchedulingError::InvalidCronExpression(expression.to_string()))?;

    Ok(schedule
        .after(&from_exclusive)
        .take_while(|fire| *fire <= to_inclusive)
        .map(|fire| fire.timestamp())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn rejects_l_w_hash_operators() {
        assert!(expand("0 0 L * *", ts(2024, 1, 1, 0, 0), ts(2024, 1, 2, 0, 0)).is_err());
        assert!(expand("0 0 1W * *", ts(2024, 1, 1, 0, 0), ts(2024, 1, 2, 0, 0)).is_err());
        assert!(expand("0 0 * * MON#1", ts(2024, 1, 1, 0, 0), ts(2024, 1, 2, 0, 0)).is_err());
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(expand("0 0 * *", ts(2024, 1, 1, 0, 0), ts(2024, 1, 2, 0, 0)).is_err());
    }

    #[test]
    fn every_two_minutes_expands_within_window() {
        let from = ts(2024, 1, 1, 0, 0);
        let to = from + chrono::Duration::hours(2);
        let fires = expand("*/2 * * * *", from, to).unwrap();
        assert_eq!(fires.len(), 60); // one every 2 min over 2h, exclusive of `from`
        assert_eq!(fires[0], (from + chrono::Duration::minutes(2)).timestamp());
        assert_eq!(fires.last().copied().unwrap(), to.timestamp());
    }

    #[test]
    fn daily_at_fixed_time() {
        let from = ts(2024, 6, 1, 0, 0);
        let to = from + chrono::Duration::hours(24);
        let fires = expand("0 8 * * *", from, to).unwrap();
        assert_eq!(fires, vec![ts(2024, 6, 1, 8, 0).timestamp()]);
    }

    #[test]
    fn is_deterministic() {
        let from = ts(2024, 3, 1, 0, 0);
        let to = from + chrono::Duration::hours(5);
        let a = expand("0,30 * * * *", from, to).unwrap();
        let b = expand("0,30 * * * *", from, to).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn range_and_list_operators_supported() {
        let from = ts(2024, 1, 1, 0, 0);
        let to = from + chrono::Duration::hours(1);
        assert!(expand("0-5 * * * *", from, to).is_ok());
        assert!(expand("0,15,30,45 * * * *", from, to).is_ok());
    }

    #[test]
    fn exclusive_lower_bound() {
        // A firing exactly at `from` must NOT be included.
        let from = ts(2024, 1, 1, 8, 0);
        let to = from + chrono::Duration::hours(1);
        let fires = expand("0 8 * * *", from, to).unwrap();
        assert!(fires.is_empty());
    }
}
