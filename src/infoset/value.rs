// src/infoset/value.rs

//! Typed attribute values
//!
//! Infoset attributes are stored as XML attribute text. `AttributeValue`
//! defines how a Rust type maps onto that text: how it is rendered, how it
//! is parsed back, and what value stands in when the attribute is absent.
//! Absence is not an error; unparsable text is.

use chrono::{DateTime, Utc};

/// A value that can live in an infoset attribute.
pub trait AttributeValue: Sized {
    /// Type name used in conversion error messages.
    const TYPE_NAME: &'static str;

    /// The value an absent attribute reads back as.
    fn absent() -> Self;

    /// Render the value as attribute text.
    fn to_attr(&self) -> String;

    /// Parse attribute text, returning `None` when the text does not
    /// represent a value of this type.
    fn parse_attr(raw: &str) -> Option<Self>;
}

impl AttributeValue for String {
    const TYPE_NAME: &'static str = "String";

    fn absent() -> Self {
        String::new()
    }

    fn to_attr(&self) -> String {
        self.clone()
    }

    fn parse_attr(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl AttributeValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn absent() -> Self {
        false
    }

    fn to_attr(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }

    fn parse_attr(raw: &str) -> Option<Self> {
        match raw.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl AttributeValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn absent() -> Self {
        0
    }

    fn to_attr(&self) -> String {
        self.to_string()
    }

    fn parse_attr(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl AttributeValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn absent() -> Self {
        0
    }

    fn to_attr(&self) -> String {
        self.to_string()
    }

    fn parse_attr(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl AttributeValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn absent() -> Self {
        0.0
    }

    fn to_attr(&self) -> String {
        self.to_string()
    }

    fn parse_attr(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl AttributeValue for DateTime<Utc> {
    const TYPE_NAME: &'static str = "DateTime<Utc>";

    fn absent() -> Self {
        DateTime::UNIX_EPOCH
    }

    fn to_attr(&self) -> String {
        self.to_rfc3339()
    }

    fn parse_attr(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn string_passes_through() {
        assert_eq!(String::parse_attr("hello"), Some("hello".to_string()));
        assert_eq!(String::absent(), "");
    }

    #[test]
    fn bool_accepts_xml_forms() {
        assert_eq!(bool::parse_attr("true"), Some(true));
        assert_eq!(bool::parse_attr("0"), Some(false));
        assert_eq!(bool::parse_attr("yes"), None);
        assert!(!bool::absent());
    }

    #[test]
    fn integers_round_trip() {
        assert_eq!(i64::parse_attr(&(-42i64).to_attr()), Some(-42));
        assert_eq!(i32::parse_attr(" 17 "), Some(17));
        assert_eq!(i64::parse_attr("twelve"), None);
        assert_eq!(i64::parse_attr(""), None);
    }

    #[test]
    fn float_round_trips() {
        assert_eq!(f64::parse_attr(&(2.5f64).to_attr()), Some(2.5));
        assert_eq!(f64::parse_attr("not-a-number"), None);
    }

    #[test]
    fn timestamp_round_trips_in_utc() {
        let moment = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap();
        assert_eq!(DateTime::<Utc>::parse_attr(&moment.to_attr()), Some(moment));
    }

    #[test]
    fn timestamp_offset_normalized_to_utc() {
        let parsed = DateTime::<Utc>::parse_attr("2024-03-09T16:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap());
    }

    #[test]
    fn absent_timestamp_is_epoch() {
        assert_eq!(DateTime::<Utc>::absent().timestamp(), 0);
    }
}
