//! Weekly availability calendars.
//!
//! Teacher working hours and classroom opening hours arrive as loosely
//! typed JSON: either an object keyed by day name, or a string holding
//! such an object. They are parsed once, at the input boundary, into a
//! [`WeeklyAvailability`] of merged half-open intervals per day.
//!
//! Parse failures never propagate as errors into the scheduler. They
//! become an [`Availability::Malformed`] value carrying the
//! [`AvailabilityWarning`], and the owner is treated as unavailable.
//!
//! # Accepted shapes
//!
//! ```json
//! { "monday": [{ "start": "09:00", "end": "11:00" }, "14:00-16:00"],
//!   "Wednesday": [] }
//! ```
//!
//! A day that is not listed has no availability.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::grid::{Day, TimeRange};

/// Why an availability map could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AvailabilityWarning {
    /// No map was supplied where one is required.
    #[error("availability map is missing")]
    Missing,
    /// Serialized text is not valid JSON.
    #[error("availability text is not valid JSON: {0}")]
    InvalidJson(String),
    /// The top-level value is not a day-keyed object.
    #[error("availability must be an object keyed by day, got {0}")]
    NotAnObject(String),
    /// A key is not a recognizable day name.
    #[error("unknown day '{0}' in availability map")]
    UnknownDay(String),
    /// An interval entry is malformed or empty.
    #[error("bad interval on {day}: {detail}")]
    BadInterval { day: Day, detail: String },
}

/// Day-keyed availability windows.
///
/// Windows of each day are kept sorted and merged, so containment of a
/// requested range in the union reduces to containment in one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    days: BTreeMap<Day, Vec<TimeRange>>,
}

impl WeeklyAvailability {
    /// Creates an empty calendar (available nowhere).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a window on a day.
    pub fn with_window(mut self, day: Day, start: u32, end: u32) -> Self {
        self.add_window(day, TimeRange::new(start, end));
        self
    }

    /// Adds a window, merging it with overlapping or touching ones.
    pub fn add_window(&mut self, day: Day, window: TimeRange) {
        let windows = self.days.entry(day).or_default();
        windows.push(window);
        windows.sort_by_key(|w| w.start);

        let mut merged: Vec<TimeRange> = Vec::with_capacity(windows.len());
        for w in windows.drain(..) {
            match merged.last_mut() {
                Some(last) if w.start <= last.end => last.end = last.end.max(w.end),
                _ => merged.push(w),
            }
        }
        *windows = merged;
    }

    /// Marks a day as explicitly declared, even with no windows.
    fn declare_day(&mut self, day: Day) {
        self.days.entry(day).or_default();
    }

    /// Whether no day is declared at all.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Merged windows of a day.
    pub fn windows(&self, day: Day) -> &[TimeRange] {
        self.days.get(&day).map(|w| w.as_slice()).unwrap_or(&[])
    }

    /// Whether `range` lies within the union of the day's windows.
    pub fn covers(&self, day: Day, range: TimeRange) -> bool {
        self.windows(day).iter().any(|w| w.contains(&range))
    }

    /// Total available minutes across the week.
    pub fn total_minutes(&self) -> u32 {
        self.days
            .values()
            .flat_map(|ws| ws.iter())
            .map(|w| w.duration_min())
            .sum()
    }

    /// Parses a JSON availability value.
    ///
    /// A JSON string is decoded once more as serialized JSON.
    pub fn from_value(raw: &Value) -> Result<Self, AvailabilityWarning> {
        match raw {
            Value::Null => Err(AvailabilityWarning::Missing),
            Value::String(text) => {
                if text.trim().is_empty() {
                    return Err(AvailabilityWarning::Missing);
                }
                let decoded: Value = serde_json::from_str(text)
                    .map_err(|e| AvailabilityWarning::InvalidJson(e.to_string()))?;
                match decoded {
                    Value::Object(_) => Self::from_value(&decoded),
                    other => Err(AvailabilityWarning::NotAnObject(kind_of(&other).into())),
                }
            }
            Value::Object(map) => {
                let mut calendar = Self::new();
                for (key, entries) in map {
                    let day = Day::parse(key)
                        .ok_or_else(|| AvailabilityWarning::UnknownDay(key.clone()))?;
                    calendar.declare_day(day);
                    let items = entries.as_array().ok_or_else(|| AvailabilityWarning::BadInterval {
                        day,
                        detail: format!("expected a list, got {}", kind_of(entries)),
                    })?;
                    for item in items {
                        calendar.add_window(day, parse_interval(day, item)?);
                    }
                }
                Ok(calendar)
            }
            other => Err(AvailabilityWarning::NotAnObject(kind_of(other).into())),
        }
    }
}

/// Parses one `{"start","end"}` object or `"HH:MM-HH:MM"` string.
fn parse_interval(day: Day, item: &Value) -> Result<TimeRange, AvailabilityWarning> {
    let bad = |detail: String| AvailabilityWarning::BadInterval { day, detail };

    let range = match item {
        Value::String(text) => {
            let (start, end) = text
                .split_once('-')
                .ok_or_else(|| bad(format!("'{text}' is not HH:MM-HH:MM")))?;
            TimeRange::parse(start, end).map_err(|e| bad(e.to_string()))?
        }
        Value::Object(fields) => {
            let start = fields.get("start").and_then(Value::as_str);
            let end = fields.get("end").and_then(Value::as_str);
            match (start, end) {
                (Some(s), Some(e)) => TimeRange::parse(s, e).map_err(|e| bad(e.to_string()))?,
                _ => return Err(bad("interval needs string 'start' and 'end'".into())),
            }
        }
        other => return Err(bad(format!("unexpected {}", kind_of(other)))),
    };

    if !range.is_valid() {
        return Err(bad(format!("empty interval {range}")));
    }
    Ok(range)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Parsed availability of a teacher or classroom.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    /// No restriction declared.
    Unrestricted,
    /// Restricted to the declared windows.
    Declared(WeeklyAvailability),
    /// Data could not be used; treated as never available.
    Malformed(AvailabilityWarning),
}

impl Availability {
    /// Parses teacher working hours. A missing map is a warning.
    pub fn for_teacher(raw: Option<&Value>) -> Self {
        match raw {
            None => Availability::Malformed(AvailabilityWarning::Missing),
            Some(value) => Self::from_result(WeeklyAvailability::from_value(value)),
        }
    }

    /// Parses classroom opening hours. A missing, blank or empty map
    /// declares no hours and means unrestricted.
    pub fn for_classroom(raw: Option<&Value>) -> Self {
        match raw {
            None | Some(Value::Null) => Availability::Unrestricted,
            Some(Value::String(text)) if text.trim().is_empty() => Availability::Unrestricted,
            Some(value) => match WeeklyAvailability::from_value(value) {
                Ok(calendar) if calendar.is_empty() => Availability::Unrestricted,
                result => Self::from_result(result),
            },
        }
    }

    fn from_result(result: Result<WeeklyAvailability, AvailabilityWarning>) -> Self {
        match result {
            Ok(calendar) => Availability::Declared(calendar),
            Err(warning) => Availability::Malformed(warning),
        }
    }

    /// Whether the owner can take `range` on `day`.
    pub fn allows(&self, day: Day, range: TimeRange) -> bool {
        match self {
            Availability::Unrestricted => true,
            Availability::Declared(calendar) => calendar.covers(day, range),
            Availability::Malformed(_) => false,
        }
    }

    /// The parse warning, if any.
    pub fn warning(&self) -> Option<&AvailabilityWarning> {
        match self {
            Availability::Malformed(w) => Some(w),
            _ => None,
        }
    }

    /// Available minutes per week, `None` when unrestricted.
    pub fn weekly_minutes(&self) -> Option<u32> {
        match self {
            Availability::Unrestricted => None,
            Availability::Declared(calendar) => Some(calendar.total_minutes()),
            Availability::Malformed(_) => Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_object_forms() {
        let raw = json!({
            "Monday": [{"start": "09:00", "end": "11:00"}, "14:00-16:00"],
            "wed": []
        });
        let cal = WeeklyAvailability::from_value(&raw).unwrap();
        assert_eq!(cal.windows(Day::Monday).len(), 2);
        assert!(cal.windows(Day::Wednesday).is_empty());
        assert!(cal.covers(Day::Monday, TimeRange::new(540, 600)));
        assert!(cal.covers(Day::Monday, TimeRange::new(840, 960)));
        assert!(!cal.covers(Day::Monday, TimeRange::new(600, 720)));
        assert!(!cal.covers(Day::Tuesday, TimeRange::new(540, 600)));
        assert_eq!(cal.total_minutes(), 240);
    }

    #[test]
    fn test_parse_serialized_string() {
        let raw = Value::String(r#"{"friday": ["08:00-10:00"]}"#.into());
        let cal = WeeklyAvailability::from_value(&raw).unwrap();
        assert!(cal.covers(Day::Friday, TimeRange::new(480, 600)));
    }

    #[test]
    fn test_adjacent_windows_merge() {
        let cal = WeeklyAvailability::new()
            .with_window(Day::Monday, 540, 600)
            .with_window(Day::Monday, 600, 660);
        assert_eq!(cal.windows(Day::Monday), &[TimeRange::new(540, 660)]);
        // Union containment across the former boundary
        assert!(cal.covers(Day::Monday, TimeRange::new(570, 630)));
    }

    #[test]
    fn test_parse_failures_are_values() {
        assert_eq!(
            WeeklyAvailability::from_value(&Value::Null),
            Err(AvailabilityWarning::Missing)
        );
        assert!(matches!(
            WeeklyAvailability::from_value(&Value::String("{not json".into())),
            Err(AvailabilityWarning::InvalidJson(_))
        ));
        assert!(matches!(
            WeeklyAvailability::from_value(&json!([1, 2])),
            Err(AvailabilityWarning::NotAnObject(_))
        ));
        assert!(matches!(
            WeeklyAvailability::from_value(&json!({"moonday": []})),
            Err(AvailabilityWarning::UnknownDay(_))
        ));
        assert!(matches!(
            WeeklyAvailability::from_value(&json!({"monday": ["11:00-09:00"]})),
            Err(AvailabilityWarning::BadInterval { day: Day::Monday, .. })
        ));
        assert!(matches!(
            WeeklyAvailability::from_value(&json!({"monday": [{"start": "09:00"}]})),
            Err(AvailabilityWarning::BadInterval { .. })
        ));
    }

    #[test]
    fn test_teacher_vs_classroom_defaults() {
        let teacher = Availability::for_teacher(None);
        assert_eq!(teacher.warning(), Some(&AvailabilityWarning::Missing));
        assert!(!teacher.allows(Day::Monday, TimeRange::new(540, 600)));

        let room = Availability::for_classroom(None);
        assert_eq!(room, Availability::Unrestricted);
        assert!(room.allows(Day::Sunday, TimeRange::new(0, 60)));
        assert_eq!(room.weekly_minutes(), None);

        let broken = Availability::for_classroom(Some(&json!("garbage")));
        assert!(broken.warning().is_some());
        assert!(!broken.allows(Day::Monday, TimeRange::new(540, 600)));
    }

    #[test]
    fn test_blank_classroom_hours_unrestricted() {
        for raw in [json!(null), json!(""), json!("   \n\t")] {
            let room = Availability::for_classroom(Some(&raw));
            assert_eq!(room, Availability::Unrestricted, "raw = {raw}");
            assert!(room.allows(Day::Wednesday, TimeRange::new(600, 720)));
        }

        // Blank teacher hours are still missing data
        let teacher = Availability::for_teacher(Some(&json!("  ")));
        assert_eq!(teacher.warning(), Some(&AvailabilityWarning::Missing));
    }

    #[test]
    fn test_empty_object_declares_no_hours() {
        for raw in [json!({}), json!("{}"), json!(" {} ")] {
            let room = Availability::for_classroom(Some(&raw));
            assert_eq!(room, Availability::Unrestricted, "raw = {raw}");
            assert_eq!(room.weekly_minutes(), None);
        }

        // A listed day with no windows is a real restriction
        let closed = Availability::for_classroom(Some(&json!({"monday": []})));
        assert!(closed.warning().is_none());
        assert_eq!(closed.weekly_minutes(), Some(0));
        assert!(!closed.allows(Day::Monday, TimeRange::new(540, 600)));

        // Teachers with an empty map have no working hours
        let teacher = Availability::for_teacher(Some(&json!({})));
        assert!(teacher.warning().is_none());
        assert!(!teacher.allows(Day::Monday, TimeRange::new(540, 600)));

        let broken = Availability::for_classroom(Some(&json!("{\"monday\": 5}")));
        assert!(broken.warning().is_some());
        assert!(!broken.allows(Day::Monday, TimeRange::new(540, 600)));
    }
}
