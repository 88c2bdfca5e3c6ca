//! Parsing and formatting of post dates. A post header may spell its date in
//! one of three literal formats (see [`parse`]). The index store persists dates
//! in [`CANONICAL_FORMAT`], which is itself one of the accepted header formats,
//! so a persisted date always parses back to the same value.

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

const MINUTES: &str = "%Y-%m-%d %H:%M";
const DAY: &str = "%Y-%m-%d";
const SECONDS: &str = "%Y-%m-%d %H:%M:%S";

/// The format dates are written in when the index store is persisted.
pub const CANONICAL_FORMAT: &str = SECONDS;

/// The display format used when the configuration doesn't name one.
pub const DEFAULT_DISPLAY_FORMAT: &str = "%d-%m-%Y";

/// Parses a header date. The input is trimmed and then matched against
/// `YYYY-MM-DD HH:MM`, `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS`, in that order;
/// the first match wins. An empty input means the post is undated and yields
/// `Ok(None)`.
pub fn parse(input: &str) -> Result<Option<NaiveDateTime>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(input, MINUTES) {
        return Ok(Some(date));
    }
    if let Ok(day) = NaiveDate::parse_from_str(input, DAY) {
        return Ok(day.and_hms_opt(0, 0, 0));
    }
    NaiveDateTime::parse_from_str(input, SECONDS)
        .map(Some)
        .map_err(|_| Error::Unrecognized(input.to_owned()))
}

/// Formats an optional date with a strftime pattern. Undated posts format as
/// the empty string. `format` must have passed [`validate_format`].
pub fn display(date: &Option<NaiveDateTime>, format: &str) -> String {
    match date {
        Some(date) => date.format(format).to_string(),
        None => String::new(),
    }
}

/// Checks that a strftime pattern contains only specifiers chrono
/// understands. Formatting with an invalid pattern panics, so patterns from
/// configuration go through here first.
pub fn validate_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidFormat(format.to_owned()));
    }
    Ok(())
}

/// Serde adapter for `Option<NaiveDateTime>` fields persisted in the index
/// store. `None` is written as `null`.
pub mod persisted {
    use super::CANONICAL_FORMAT;
    use chrono::NaiveDateTime;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        date: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer
                .serialize_some(&date.format(CANONICAL_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => super::parse(&s).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// The result of a fallible date operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem with a date or a date format.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a non-empty date matches none of the accepted formats.
    #[error("unrecognized date `{0}` (expected `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD HH:MM:SS`)")]
    Unrecognized(String),

    /// Returned when a display format contains an unknown specifier.
    #[error("invalid date format `{0}`")]
    InvalidFormat(String),
}
