//! Time-of-day and duration conversion.
//!
//! All schedule math works on minutes since midnight. A window that ends at or
//! before its start is taken to end on the next day, so absolute minutes can
//! exceed 1440; they are normalized back into a day only for display.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minutes since midnight. Values past 1440 mean "the following day".
pub type Minutes = u32;

/// Minutes in one day.
pub const MINUTES_PER_DAY: Minutes = 1440;

/// Duration assumed for open-ended estimates when fitting them into slots.
pub const FLEXIBLE_DURATION_MINUTES: Minutes = 120;

/// Errors from time and duration parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("empty time string")]
    Empty,

    #[error("unrecognized time format: '{0}'")]
    Malformed(String),

    #[error("time component out of range: '{0}'")]
    OutOfRange(String),

    #[error("no duration found in '{0}'")]
    NoDuration(String),
}

/// Parse "H:MM AM/PM" or 24-hour "HH:MM" into minutes since midnight.
///
/// "12 AM" is midnight, "12 PM" is noon, and "24:00" is accepted as the
/// next-day midnight marker (returned as 0).
pub fn parse_time(text: &str) -> Result<Minutes, TimeParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let upper = trimmed.to_ascii_uppercase();
    let meridiem = if upper.ends_with("AM") {
        Some(false)
    } else if upper.ends_with("PM") {
        Some(true)
    } else {
        None
    };

    match meridiem {
        Some(is_pm) => {
            let clock = upper[..upper.len() - 2].trim_end_matches('.').trim();
            let (hour, minute) = split_clock(clock, trimmed)?;
            if !(1..=12).contains(&hour) || minute > 59 {
                return Err(TimeParseError::OutOfRange(trimmed.to_string()));
            }
            let hour24 = match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            Ok(hour24 * 60 + minute)
        }
        None => {
            let (hour, minute) = split_clock(&upper, trimmed)?;
            if hour == 24 && minute == 0 {
                return Ok(0);
            }
            if hour > 23 || minute > 59 {
                return Err(TimeParseError::OutOfRange(trimmed.to_string()));
            }
            Ok(hour * 60 + minute)
        }
    }
}

/// Best-effort parse that falls back to midnight.
///
/// Use only where a default is acceptable; 0 is indistinguishable from a real
/// "12:00 AM" here.
pub fn parse_time_or_midnight(text: &str) -> Minutes {
    match parse_time(text) {
        Ok(minutes) => minutes,
        Err(err) => {
            tracing::warn!(input = text, error = %err, "unparsable time, defaulting to 12:00 AM");
            0
        }
    }
}

fn split_clock(clock: &str, original: &str) -> Result<(u32, u32), TimeParseError> {
    let malformed = || TimeParseError::Malformed(original.to_string());
    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.trim(), m.trim()),
        None => (clock.trim(), "0"),
    };
    if hour.is_empty() || minute.is_empty() || minute.len() > 2 {
        return Err(malformed());
    }
    let hour: u32 = hour.parse().map_err(|_| malformed())?;
    let minute: u32 = minute.parse().map_err(|_| malformed())?;
    Ok((hour, minute))
}

/// Render minutes as a 12-hour clock string ("8:05 AM").
///
/// Any integer is accepted and normalized into a single day first.
pub fn format_time(minutes: i64) -> String {
    let day = i64::from(MINUTES_PER_DAY);
    let normalized = ((minutes % day) + day) % day;
    let hour24 = normalized / 60;
    let minute = normalized % 60;
    let suffix = if hour24 < 12 { "AM" } else { "PM" };
    let hour12 = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    format!("{hour12}:{minute:02} {suffix}")
}

/// Absolute end of a wake/sleep window.
///
/// A sleep time at or before wake belongs to the next day, so equal times
/// yield a full 24 hours.
pub fn resolve_window(wake: Minutes, sleep: Minutes) -> Minutes {
    if sleep <= wake {
        sleep + MINUTES_PER_DAY
    } else {
        sleep
    }
}

/// A parsed free-text duration estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationEstimate {
    /// Minutes used for slot fitting
    pub minutes: Minutes,
    /// Whether the estimate was open-ended
    pub flexible: bool,
    /// Original text, kept for display
    pub text: String,
}

const FLEXIBLE_MARKERS: &[&str] = &[
    "as long as needed",
    "flexible",
    "open-ended",
    "open ended",
    "varies",
    "variable",
    "ongoing",
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unit {
    Minute,
    Hour,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Article,
    Unit(Unit),
    Range,
}

/// Heuristic parse of durations such as "25 minutes", "1.5 hours",
/// "1 hour 30 minutes", "20-30 min" (upper bound wins) or "as long as needed"
/// (flexible, 120 minutes for fitting).
pub fn parse_duration(text: &str) -> Result<DurationEstimate, TimeParseError> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return Err(TimeParseError::Empty);
    }

    if FLEXIBLE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Ok(DurationEstimate {
            minutes: FLEXIBLE_DURATION_MINUTES,
            flexible: true,
            text: text.to_string(),
        });
    }

    let tokens = tokenize_duration(&lower);

    // (value, unit, is range lower bound)
    let mut quantities: Vec<(f64, Option<Unit>, bool)> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let value = match tokens[i] {
            Token::Number(v) => Some(v),
            Token::Article if matches!(tokens.get(i + 1), Some(Token::Unit(_))) => Some(1.0),
            _ => None,
        };
        if let Some(value) = value {
            let unit = match tokens.get(i + 1) {
                Some(Token::Unit(u)) => {
                    i += 1;
                    Some(*u)
                }
                _ => None,
            };
            let range_lower = matches!(tokens.get(i + 1), Some(Token::Range));
            quantities.push((value, unit, range_lower));
        }
        i += 1;
    }

    if quantities.is_empty() {
        return Err(TimeParseError::NoDuration(text.to_string()));
    }

    let mut total = 0.0;
    for (idx, (value, unit, range_lower)) in quantities.iter().enumerate() {
        if *range_lower {
            continue;
        }
        let unit = unit
            .or_else(|| quantities[idx + 1..].iter().find_map(|(_, u, _)| *u))
            .unwrap_or(Unit::Minute);
        total += match unit {
            Unit::Minute => *value,
            Unit::Hour => *value * 60.0,
        };
    }

    Ok(DurationEstimate {
        minutes: total.round().max(0.0) as Minutes,
        flexible: false,
        text: text.to_string(),
    })
}

fn tokenize_duration(lower: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = lower.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            let mut number = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    number.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            if let Ok(v) = number.parse::<f64>() {
                tokens.push(Token::Number(v));
            }
        } else if c.is_alphabetic() {
            let mut word = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphabetic() {
                    word.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            match word.as_str() {
                "m" | "min" | "mins" | "minute" | "minutes" => tokens.push(Token::Unit(Unit::Minute)),
                "h" | "hr" | "hrs" | "hour" | "hours" => tokens.push(Token::Unit(Unit::Hour)),
                "to" | "or" => tokens.push(Token::Range),
                "a" | "an" | "one" => tokens.push(Token::Article),
                _ => {}
            }
        } else {
            if matches!(c, '-' | '–' | '~') {
                tokens.push(Token::Range);
            }
            chars.next();
        }
    }

    tokens
}
