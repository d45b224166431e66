//! Parsing and formatting of transaction dates and timestamps.
//!
//! Transaction dates are calendar dates and are written as `YYYY-MM-DD` in
//! JSON. Clients may also send a full RFC 3339 timestamp, in which case only
//! the calendar date is kept. Record timestamps are RFC 3339 in JSON and
//! ISO-8601 with millisecond precision in CSV exports.

use time::{
    Date, OffsetDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::Error;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

const ISO_TIMESTAMP_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

/// Parse a date given either as `YYYY-MM-DD` or as an RFC 3339 timestamp.
///
/// # Errors
/// Returns [Error::Validation] if `text` is neither.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    let text = text.trim();

    if let Ok(date) = Date::parse(text, DATE_FORMAT) {
        return Ok(date);
    }

    OffsetDateTime::parse(text, &Rfc3339)
        .map(|timestamp| timestamp.date())
        .map_err(|_| Error::Validation(format!("could not parse \"{text}\" as a date")))
}

/// Format `date` as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Format `timestamp` in UTC as an ISO-8601 string with millisecond precision,
/// e.g. `2025-01-10T08:30:00.000Z`.
pub fn iso_timestamp(timestamp: OffsetDateTime) -> String {
    let utc = timestamp.to_offset(UtcOffset::UTC);

    utc.format(ISO_TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| utc.to_string())
}

/// The ISO-8601 timestamp for midnight UTC at the start of `date`.
pub fn iso_date_timestamp(date: Date) -> String {
    iso_timestamp(date.midnight().assume_utc())
}

/// Serde (de)serialization of a [Date] as `YYYY-MM-DD`.
pub mod date {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let text = String::deserialize(deserializer)?;

        super::parse_date(&text).map_err(de::Error::custom)
    }
}

/// Serde (de)serialization of an optional [Date] as `YYYY-MM-DD`.
///
/// `null` and an empty string both deserialize to `None`.
pub mod option_date {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&super::format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) if !text.trim().is_empty() => super::parse_date(&text)
                .map(Some)
                .map_err(de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Serde (de)serialization of an optional [OffsetDateTime] as RFC 3339.
pub mod option_timestamp {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    pub fn serialize<S: Serializer>(
        timestamp: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match timestamp {
            Some(timestamp) => {
                let text = timestamp
                    .format(&Rfc3339)
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| OffsetDateTime::parse(&text, &Rfc3339).map_err(de::Error::custom))
            .transpose()
    }
}
