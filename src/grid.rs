//! Weekly time grid arithmetic.
//!
//! All times of day are minutes since midnight. A time range is the
//! half-open interval `[start, end)`: two ranges that merely touch
//! (`09:00–10:00` and `10:00–11:00`) do not overlap.
//!
//! # Example
//!
//! ```
//! use u_timetable::grid::{generate_blocks, time_to_minutes, minutes_to_time};
//!
//! let blocks = generate_blocks(60, 8 * 60, 12 * 60, 10 * 60, 11 * 60);
//! assert_eq!(blocks.len(), 3); // 08-09, 09-10, 11-12
//! assert_eq!(time_to_minutes("09:30").unwrap(), 570);
//! assert_eq!(minutes_to_time(545), "09:05");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Last representable minute boundary (24:00).
pub const END_OF_DAY: u32 = 24 * 60;

/// Error parsing an `"HH:MM"` time of day.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    /// Text is not of the form `H:MM` / `HH:MM`.
    #[error("expected HH:MM, got '{0}'")]
    Format(String),
    /// Hour or minute component out of range.
    #[error("time of day out of range: '{0}'")]
    OutOfRange(String),
}

/// Day of the week.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    /// Monday through Friday.
    pub const WEEKDAYS: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    /// Parses an English day name, case-insensitively.
    ///
    /// Accepts full names (`"Monday"`) and three-letter abbreviations (`"mon"`).
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let day = match lower.as_str() {
            "monday" | "mon" => Day::Monday,
            "tuesday" | "tue" => Day::Tuesday,
            "wednesday" | "wed" => Day::Wednesday,
            "thursday" | "thu" => Day::Thursday,
            "friday" | "fri" => Day::Friday,
            "saturday" | "sat" => Day::Saturday,
            "sunday" | "sun" => Day::Sunday,
            _ => return None,
        };
        Some(day)
    }

    /// Lowercase day name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A half-open time-of-day interval `[start, end)` in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start minute (inclusive).
    pub start: u32,
    /// End minute (exclusive).
    pub end: u32,
}

impl TimeRange {
    /// Creates a new range.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Parses a range from two `"HH:MM"` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeParseError> {
        Ok(Self::new(time_to_minutes(start)?, time_to_minutes(end)?))
    }

    /// Length in minutes (0 for inverted ranges).
    #[inline]
    pub fn duration_min(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether two ranges overlap (half-open).
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        ranges_overlap(self.start, self.end, other.start, other.end)
    }

    /// Whether `other` lies entirely within this range.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether the range is non-empty.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            minutes_to_time(self.start),
            minutes_to_time(self.end)
        )
    }
}

/// Converts `"HH:MM"` to minutes since midnight.
///
/// `"24:00"` is accepted as the end-of-day boundary.
pub fn time_to_minutes(text: &str) -> Result<u32, TimeParseError> {
    let trimmed = text.trim();
    let (h, m) = trimmed
        .split_once(':')
        .ok_or_else(|| TimeParseError::Format(text.to_string()))?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return Err(TimeParseError::Format(text.to_string()));
    }
    let hours: u32 = h
        .parse()
        .map_err(|_| TimeParseError::Format(text.to_string()))?;
    let minutes: u32 = m
        .parse()
        .map_err(|_| TimeParseError::Format(text.to_string()))?;
    if minutes >= 60 || hours > 24 || (hours == 24 && minutes > 0) {
        return Err(TimeParseError::OutOfRange(text.to_string()));
    }
    Ok(hours * 60 + minutes)
}

/// Converts minutes since midnight to zero-padded `"HH:MM"`.
pub fn minutes_to_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Half-open overlap test: `s1 < e2 && s2 < e1`.
#[inline]
pub fn ranges_overlap(s1: u32, e1: u32, s2: u32, e2: u32) -> bool {
    s1 < e2 && s2 < e1
}

/// Whether blocks form one gapless chain.
///
/// Zero or one block is trivially consecutive. Otherwise the blocks,
/// ordered by start, must chain end-to-start.
pub fn are_consecutive(blocks: &[TimeRange]) -> bool {
    if blocks.len() < 2 {
        return true;
    }
    let mut sorted = blocks.to_vec();
    sorted.sort_by_key(|b| b.start);
    sorted.windows(2).all(|w| w[0].end == w[1].start)
}

/// Whole hours spanned by `[start, end)`; partial hours round up.
pub fn duration_hours(start: u32, end: u32) -> u32 {
    end.saturating_sub(start).div_ceil(60)
}

/// Generates the teaching blocks of one day.
///
/// Blocks start at `day_start` and step by `slot_duration_min`. A block
/// overlapping `[lunch_start, lunch_end)` is omitted; the last block is
/// truncated at `day_end`.
pub fn generate_blocks(
    slot_duration_min: u32,
    day_start: u32,
    day_end: u32,
    lunch_start: u32,
    lunch_end: u32,
) -> Vec<TimeRange> {
    let mut blocks = Vec::new();
    if slot_duration_min == 0 || day_start >= day_end {
        return blocks;
    }

    let mut start = day_start;
    while start < day_end {
        let end = start.saturating_add(slot_duration_min).min(day_end);
        if !ranges_overlap(start, end, lunch_start, lunch_end) {
            blocks.push(TimeRange::new(start, end));
        }
        start = end;
    }
    blocks
}

/// Weekly grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeGrid {
    /// Block length in minutes.
    pub slot_duration_min: u32,
    /// First teaching minute of the day.
    pub day_start: u32,
    /// End of the teaching day (exclusive).
    pub day_end: u32,
    /// Lunch break start.
    pub lunch_start: u32,
    /// Lunch break end (exclusive). Equal to `lunch_start` for no break.
    pub lunch_end: u32,
    /// Teaching days, in priority order.
    pub days: Vec<Day>,
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self {
            slot_duration_min: 60,
            day_start: 8 * 60,
            day_end: 18 * 60,
            lunch_start: 12 * 60,
            lunch_end: 13 * 60,
            days: Day::WEEKDAYS.to_vec(),
        }
    }
}

impl TimeGrid {
    /// Builds a grid from `"HH:MM"` bounds over the given days.
    pub fn from_clock(
        slot_duration_min: u32,
        day_start: &str,
        day_end: &str,
        lunch_start: &str,
        lunch_end: &str,
        days: Vec<Day>,
    ) -> Result<Self, TimeParseError> {
        Ok(Self {
            slot_duration_min,
            day_start: time_to_minutes(day_start)?,
            day_end: time_to_minutes(day_end)?,
            lunch_start: time_to_minutes(lunch_start)?,
            lunch_end: time_to_minutes(lunch_end)?,
            days,
        })
    }

    /// Blocks of one teaching day.
    pub fn blocks(&self) -> Vec<TimeRange> {
        generate_blocks(
            self.slot_duration_min,
            self.day_start,
            self.day_end,
            self.lunch_start,
            self.lunch_end,
        )
    }

    /// Number of consecutive blocks needed to teach `hours`.
    pub fn blocks_for_hours(&self, hours: u32) -> usize {
        if self.slot_duration_min == 0 {
            return 0;
        }
        (u64::from(hours) * 60).div_ceil(u64::from(self.slot_duration_min)) as usize
    }

    /// All spans of `count` consecutive blocks within a day.
    ///
    /// Runs interrupted by lunch are skipped.
    pub fn windows_for(&self, count: usize) -> Vec<TimeRange> {
        if count == 0 {
            return Vec::new();
        }
        self.blocks()
            .windows(count)
            .filter(|run| are_consecutive(run))
            .map(|run| TimeRange::new(run[0].start, run[run.len() - 1].end))
            .collect()
    }

    /// Total teaching blocks across the week.
    pub fn weekly_capacity(&self) -> usize {
        self.blocks().len() * self.days.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(text: &str) -> u32 {
        time_to_minutes(text).unwrap()
    }

    #[test]
    fn test_time_round_trip() {
        assert_eq!(hm("00:00"), 0);
        assert_eq!(hm("09:05"), 545);
        assert_eq!(hm("9:05"), 545);
        assert_eq!(hm("24:00"), END_OF_DAY);
        assert_eq!(minutes_to_time(545), "09:05");
        assert_eq!(minutes_to_time(0), "00:00");
        for m in [0, 1, 59, 60, 479, 720, 1439] {
            assert_eq!(hm(&minutes_to_time(m)), m);
        }
    }

    #[test]
    fn test_time_parse_errors() {
        assert!(matches!(time_to_minutes("0900"), Err(TimeParseError::Format(_))));
        assert!(matches!(time_to_minutes("09:5"), Err(TimeParseError::Format(_))));
        assert!(matches!(time_to_minutes("ab:cd"), Err(TimeParseError::Format(_))));
        assert!(matches!(
            time_to_minutes("09:60"),
            Err(TimeParseError::OutOfRange(_))
        ));
        assert!(matches!(
            time_to_minutes("24:30"),
            Err(TimeParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_ranges_overlap_half_open() {
        // Touching endpoints never overlap
        assert!(!ranges_overlap(hm("09:00"), hm("10:00"), hm("10:00"), hm("11:00")));
        assert!(ranges_overlap(hm("09:00"), hm("10:00"), hm("09:30"), hm("10:30")));
        // Symmetric
        assert!(ranges_overlap(hm("09:30"), hm("10:30"), hm("09:00"), hm("10:00")));
        assert!(!ranges_overlap(hm("10:00"), hm("11:00"), hm("09:00"), hm("10:00")));
        // Containment
        assert!(ranges_overlap(480, 720, 540, 600));
    }

    #[test]
    fn test_are_consecutive() {
        assert!(are_consecutive(&[]));
        assert!(are_consecutive(&[TimeRange::new(540, 600)]));
        assert!(are_consecutive(&[
            TimeRange::new(540, 600),
            TimeRange::new(600, 660)
        ]));
        // Unordered input is checked by start order
        assert!(are_consecutive(&[
            TimeRange::new(600, 660),
            TimeRange::new(540, 600)
        ]));
        assert!(!are_consecutive(&[
            TimeRange::new(540, 600),
            TimeRange::new(660, 720)
        ]));
    }

    #[test]
    fn test_duration_rounds_up() {
        assert_eq!(duration_hours(540, 600), 1);
        assert_eq!(duration_hours(540, 630), 2);
        assert_eq!(duration_hours(540, 541), 1);
        assert_eq!(duration_hours(540, 540), 0);
        assert_eq!(duration_hours(600, 540), 0);
    }

    #[test]
    fn test_generate_blocks_skips_lunch() {
        let blocks = generate_blocks(60, hm("08:00"), hm("18:00"), hm("12:00"), hm("13:00"));
        assert_eq!(blocks.len(), 9);
        assert!(blocks
            .iter()
            .all(|b| !ranges_overlap(b.start, b.end, hm("12:00"), hm("13:00"))));
        assert_eq!(blocks[3], TimeRange::new(hm("11:00"), hm("12:00")));
        assert_eq!(blocks[4], TimeRange::new(hm("13:00"), hm("14:00")));
    }

    #[test]
    fn test_generate_blocks_chain_and_truncate() {
        let blocks = generate_blocks(45, hm("08:00"), hm("10:00"), 0, 0);
        assert_eq!(
            blocks,
            vec![
                TimeRange::new(480, 525),
                TimeRange::new(525, 570),
                TimeRange::new(570, 600), // truncated at day end
            ]
        );
        assert!(are_consecutive(&blocks));
        assert!(blocks.iter().all(|b| b.end <= hm("10:00")));
    }

    #[test]
    fn test_generate_blocks_huge_slot() {
        assert_eq!(
            generate_blocks(u32::MAX, 480, 1080, 720, 780),
            vec![TimeRange::new(480, 1080)]
        );
        assert_eq!(
            generate_blocks(60, u32::MAX - 90, u32::MAX, 0, 0),
            vec![
                TimeRange::new(u32::MAX - 90, u32::MAX - 30),
                TimeRange::new(u32::MAX - 30, u32::MAX),
            ]
        );
    }

    #[test]
    fn test_blocks_for_huge_hours() {
        let grid = TimeGrid::default();
        assert_eq!(grid.blocks_for_hours(3), 3);
        assert_eq!(grid.blocks_for_hours(u32::MAX), u32::MAX as usize);
    }

    #[test]
    fn test_generate_blocks_misaligned_lunch() {
        // Lunch 12:30-13:30 knocks out both 12-13 and 13-14
        let blocks = generate_blocks(60, hm("08:00"), hm("16:00"), hm("12:30"), hm("13:30"));
        let starts: Vec<u32> = blocks.iter().map(|b| b.start / 60).collect();
        assert_eq!(starts, vec![8, 9, 10, 11, 14, 15]);
    }

    #[test]
    fn test_generate_blocks_degenerate() {
        assert!(generate_blocks(0, 480, 600, 0, 0).is_empty());
        assert!(generate_blocks(60, 600, 480, 0, 0).is_empty());
    }

    #[test]
    fn test_grid_windows_skip_lunch() {
        let grid = TimeGrid::default();
        assert_eq!(grid.blocks_for_hours(2), 2);
        let windows = grid.windows_for(2);
        // 3 morning runs + 4 afternoon runs
        assert_eq!(windows.len(), 7);
        assert!(windows.iter().all(|w| w.duration_min() == 120));
        assert!(!windows.contains(&TimeRange::new(hm("11:00"), hm("14:00"))));
        assert_eq!(grid.weekly_capacity(), 45);
    }

    #[test]
    fn test_grid_from_clock() {
        let grid =
            TimeGrid::from_clock(30, "08:30", "12:00", "10:00", "10:30", vec![Day::Monday])
                .unwrap();
        assert_eq!(grid.day_start, 510);
        assert_eq!(grid.blocks().len(), 6);
        assert_eq!(grid.blocks_for_hours(1), 2);
        assert!(TimeGrid::from_clock(30, "8", "12:00", "10:00", "10:30", vec![]).is_err());
    }

    #[test]
    fn test_day_parse() {
        assert_eq!(Day::parse("Monday"), Some(Day::Monday));
        assert_eq!(Day::parse("WED"), Some(Day::Wednesday));
        assert_eq!(Day::parse(" friday "), Some(Day::Friday));
        assert_eq!(Day::parse("funday"), None);
        assert_eq!(Day::Thursday.to_string(), "thursday");
    }
}
