//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;
use thiserror::Error;

use crate::config::SiteConfig;

#[derive(Debug, Error)]
pub enum DateFormatError {
    #[error("unknown locale: {0}")]
    Locale(String),
    #[error("unknown time zone: {0}")]
    TimeZone(String),
}

/// Formats publication dates for display in a fixed locale and time zone
///
/// The pattern uses date-fns style tokens (`dd MMM yyyy`), which are
/// translated to chrono specifiers once at construction.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    pub fn new(pattern: &str, locale: &str, timezone: &str) -> Result<Self, DateFormatError> {
        let locale =
            Locale::try_from(locale).map_err(|_| DateFormatError::Locale(locale.to_string()))?;
        let timezone = if timezone.is_empty() {
            Tz::UTC
        } else {
            timezone
                .parse::<Tz>()
                .map_err(|_| DateFormatError::TimeZone(timezone.to_string()))?
        };

        Ok(Self {
            pattern: date_fns_to_chrono_format(pattern),
            locale,
            timezone,
        })
    }

    pub fn from_config(config: &SiteConfig) -> Result<Self, DateFormatError> {
        Self::new(&config.date_format, &config.language, &config.timezone)
    }

    /// Format a date for display
    ///
    /// # Examples
    /// ```ignore
    /// formatter.format(&date) // -> "05 jan 2022"
    /// ```
    pub fn format(&self, date: &DateTime<FixedOffset>) -> String {
        date.with_timezone(&self.timezone)
            .format_localized(&self.pattern, self.locale)
            .to_string()
    }

    /// Format an optional date, empty when there is none
    pub fn format_optional(&self, date: Option<&DateTime<FixedOffset>>) -> String {
        date.map(|d| self.format(d)).unwrap_or_default()
    }
}

/// Parse a publication timestamp as sent by the content API
///
/// Accepts `2021-03-25T19:25:28+0000` as well as RFC 3339.
pub fn parse_publication_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map_err(|e| tracing::debug!("Unparseable publication date {:?}: {}", value, e))
        .ok()
}

/// Format a date in ISO 8601 for `<time datetime="...">`
pub fn date_xml(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Convert a date-fns format string to a chrono format string
///
/// Runs of the same letter form one token. Text inside single quotes is
/// copied literally.
fn date_fns_to_chrono_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut result = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut result, c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let spec = match (c, run) {
            ('y', 2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', _) => Some("%d"),
            ('E', 4) => Some("%A"),
            ('E', _) => Some("%a"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', _) => Some("%M"),
            ('s', _) => Some("%S"),
            ('a', _) => Some("%p"),
            _ => None,
        };

        match spec {
            Some(spec) => result.push_str(spec),
            None => {
                for _ in 0..run {
                    push_literal(&mut result, c);
                }
            }
        }
        i += run;
    }

    result
}

fn push_literal(result: &mut String, c: char) {
    if c == '%' {
        result.push_str("%%");
    } else {
        result.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt_br() -> DateFormatter {
        DateFormatter::new("dd MMM yyyy", "pt_BR", "America/Sao_Paulo").unwrap()
    }

    #[test]
    fn test_format_pt_br_month() {
        let date = parse_publication_date("2022-01-05T12:00:00+0000").unwrap();
        assert_eq!(pt_br().format(&date), "05 jan 2022");
    }

    #[test]
    fn test_format_uses_configured_time_zone() {
        // 01:00 UTC is still the previous day in Sao Paulo
        let date = parse_publication_date("2021-04-01T01:00:00+0000").unwrap();
        assert_eq!(pt_br().format(&date), "31 mar 2021");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(pt_br().format_optional(None), "");
    }

    #[test]
    fn test_parse_publication_date() {
        let date = parse_publication_date("2021-03-25T19:25:28+0000").unwrap();
        assert_eq!(date_xml(&date), "2021-03-25T19:25:28+00:00");
        assert!(parse_publication_date("2021-03-25T19:25:28Z").is_some());
        assert!(parse_publication_date("yesterday").is_none());
    }

    #[test]
    fn test_raw_date_is_untouched() {
        let date = parse_publication_date("2022-01-05T12:00:00+0000").unwrap();
        let before = date;
        let _ = pt_br().format(&date);
        assert_eq!(date, before);
    }

    #[test]
    fn test_unknown_locale_and_zone() {
        assert!(matches!(
            DateFormatter::new("dd", "xx_YY", "UTC"),
            Err(DateFormatError::Locale(_))
        ));
        assert!(matches!(
            DateFormatter::new("dd", "pt_BR", "Mars/Olympus"),
            Err(DateFormatError::TimeZone(_))
        ));
    }

    #[test]
    fn test_date_fns_to_chrono() {
        assert_eq!(date_fns_to_chrono_format("dd MMM yyyy"), "%d %b %Y");
        assert_eq!(date_fns_to_chrono_format("d 'de' MMMM"), "%-d de %B");
        assert_eq!(date_fns_to_chrono_format("HH:mm 100%"), "%H:%M 100%%");
    }
}
