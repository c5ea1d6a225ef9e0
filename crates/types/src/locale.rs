//! Number and date formatting rules for the deployment locale
//!
//! Both tables follow the shape of d3's locale definitions so they can be
//! handed to the frontend unchanged. The formatting helpers exist for
//! previews and server-side rendering of report values.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Value used by [`NumberFormat::preview`]
pub const PREVIEW_VALUE: f64 = 12345.432;

/// Nesting limit for `%c`, `%x` and `%X` expansion
const MAX_PATTERN_DEPTH: usize = 2;

/// Number formatting rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    /// Decimal separator
    pub decimal: String,
    /// Group separator
    pub thousands: String,
    /// Group sizes from the right, cycled as needed
    pub grouping: Vec<u32>,
    /// Currency prefix and suffix
    pub currency: [String; 2],
}

/// Date and time formatting rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeFormat {
    pub date_time: String,
    pub date: String,
    pub time: String,
    pub periods: [String; 2],
    /// Day names starting from Sunday
    pub days: [String; 7],
    pub short_days: [String; 7],
    pub months: [String; 12],
    pub short_months: [String; 12],
}

impl NumberFormat {
    /// Format a number with a fixed number of fraction digits
    pub fn format(&self, value: Option<f64>, precision: usize) -> String {
        let Some(value) = value else {
            return "null".to_string();
        };
        if value.is_nan() {
            return "NaN".to_string();
        }
        if value == f64::INFINITY {
            return "∞".to_string();
        }
        if value == f64::NEG_INFINITY {
            return "-∞".to_string();
        }

        let fixed = format!("{:.*}", precision, value.abs());
        let (integer, fraction) = match fixed.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (fixed.as_str(), None),
        };

        let mut out = String::new();
        if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
            out.push('-');
        }
        out.push_str(&self.group(integer));
        if let Some(fraction) = fraction {
            out.push_str(&self.decimal);
            out.push_str(fraction);
        }
        out
    }

    /// Format a number wrapped in the currency prefix and suffix
    pub fn format_currency(&self, value: Option<f64>, precision: usize) -> String {
        let [prefix, suffix] = &self.currency;
        format!("{}{}{}", prefix, self.format(value, precision), suffix)
    }

    /// Render `12345.432 => <formatted>`
    pub fn preview(&self) -> String {
        format!("{} => {}", PREVIEW_VALUE, self.format(Some(PREVIEW_VALUE), 3))
    }

    fn group(&self, digits: &str) -> String {
        if self.grouping.is_empty() || self.thousands.is_empty() {
            return digits.to_string();
        }

        let chars: Vec<char> = digits.chars().collect();
        let mut groups: Vec<String> = Vec::new();
        let mut end = chars.len();
        let mut index = 0;

        while end > 0 {
            let size = self.grouping[index] as usize;
            if size == 0 {
                groups.push(chars[..end].iter().collect());
                break;
            }
            let start = end.saturating_sub(size);
            groups.push(chars[start..end].iter().collect());
            end = start;
            index = (index + 1) % self.grouping.len();
        }

        groups.reverse();
        groups.join(&self.thousands)
    }
}

impl TimeFormat {
    /// Format a timestamp with a d3-style pattern
    ///
    /// Names come from this table; `%c`, `%x` and `%X` expand to the
    /// table's own patterns. Unknown specifiers are copied through.
    pub fn format(&self, at: &NaiveDateTime, pattern: &str) -> String {
        let mut out = String::new();
        self.expand(at, pattern, 0, &mut out);
        out
    }

    fn expand(&self, at: &NaiveDateTime, pattern: &str, depth: usize, out: &mut String) {
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let Some(spec) = chars.next() else {
                out.push('%');
                break;
            };
            match spec {
                'A' => out.push_str(&self.days[at.weekday().num_days_from_sunday() as usize]),
                'a' => out.push_str(&self.short_days[at.weekday().num_days_from_sunday() as usize]),
                'B' => out.push_str(&self.months[at.month0() as usize]),
                'b' => out.push_str(&self.short_months[at.month0() as usize]),
                'p' => out.push_str(&self.periods[usize::from(at.hour() >= 12)]),
                'c' | 'x' | 'X' if depth < MAX_PATTERN_DEPTH => {
                    let nested = match spec {
                        'c' => &self.date_time,
                        'x' => &self.date,
                        _ => &self.time,
                    };
                    self.expand(at, nested, depth + 1, out);
                }
                'd' | 'e' | 'H' | 'I' | 'j' | 'm' | 'M' | 'S' | 'y' | 'Y' => {
                    let _ = write!(out, "{}", at.format(&format!("%{}", spec)));
                }
                '%' => out.push('%'),
                other => {
                    out.push('%');
                    out.push(other);
                }
            }
        }
    }
}

fn strings<const N: usize>(items: [&str; N]) -> [String; N] {
    items.map(str::to_string)
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal: ",".to_string(),
            thousands: "\u{a0}".to_string(),
            grouping: vec![3],
            currency: strings(["", "\u{a0}\u{20b8}"]),
        }
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self {
            date_time: "%A, %e %B %Y г. %X".to_string(),
            date: "%d.%m.%Y".to_string(),
            time: "%H:%M:%S".to_string(),
            periods: strings(["AM", "PM"]),
            days: strings([
                "воскресенье",
                "понедельник",
                "вторник",
                "среда",
                "четверг",
                "пятница",
                "суббота",
            ]),
            short_days: strings(["вс", "пн", "вт", "ср", "чт", "пт", "сб"]),
            months: strings([
                "январь", "февраль", "март", "апрель", "май", "июнь", "июль", "август",
                "сентябрь", "октябрь", "ноябрь", "декабрь",
            ]),
            short_months: strings([
                "янв", "фев", "мар", "апр", "май", "июн", "июл", "авг", "сен", "окт", "ноя", "дек",
            ]),
        }
    }
}
