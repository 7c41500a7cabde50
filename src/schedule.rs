// ⏰ Schedule - when does each track start?
//
// Only the first and last tracks get their exact start time. Every other
// track is labelled with the next interval mark (:00, :15, :30, :45 for the
// default 15 minutes) once the running clock has reached it, at most one
// mark per track. Everything else stays blank.

use crate::config::ScheduleConfig;
use crate::error::CheckError;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    start: NaiveTime,
    interval_minutes: u32,
    /// Pause inserted before the track at this 0-based index
    break_before: Option<usize>,
    break_minutes: u32,
}

impl Schedule {
    pub fn new(start: NaiveTime) -> Self {
        Schedule {
            start,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            break_before: None,
            break_minutes: 0,
        }
    }

    /// Parse `HH:MM`
    pub fn parse_start(value: &str) -> Result<NaiveTime, CheckError> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| CheckError::InvalidScheduleTime {
            value: value.to_string(),
        })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self, CheckError> {
        let mut schedule = Schedule::new(Self::parse_start(&config.start)?)
            .with_interval(config.interval_minutes);
        if let Some(index) = config.break_before {
            schedule = schedule.with_break(index, config.break_minutes);
        }
        Ok(schedule)
    }

    pub fn with_interval(mut self, minutes: u32) -> Self {
        self.interval_minutes = minutes.max(1);
        self
    }

    pub fn with_break(mut self, before_index: usize, minutes: u32) -> Self {
        self.break_before = Some(before_index);
        self.break_minutes = minutes;
        self
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    /// One label per track, same order as `durations_ms`.
    ///
    /// Once the running clock leaves chrono's date range every later
    /// label stays blank.
    pub fn annotate(&self, durations_ms: &[u64]) -> Vec<Option<String>> {
        let interval = Duration::minutes(i64::from(self.interval_minutes));
        let pause = Duration::minutes(i64::from(self.break_minutes));
        let mut clock = Some(NaiveDateTime::new(NaiveDate::default(), self.start));
        let mut next_mark = Some(self.first_mark());
        let last = durations_ms.len().saturating_sub(1);

        let mut labels = Vec::with_capacity(durations_ms.len());
        for (index, duration) in durations_ms.iter().enumerate() {
            if self.break_before == Some(index) {
                clock = clock.and_then(|c| c.checked_add_signed(pause));
            }

            let Some(current) = clock else {
                labels.push(None);
                continue;
            };

            if index == 0 || index == last {
                labels.push(Some(current.format("%H:%M").to_string()));
            } else if let Some(mark) = next_mark.filter(|mark| current >= *mark) {
                labels.push(Some(mark.format("%H:%M").to_string()));
                next_mark = mark.checked_add_signed(interval);
            } else {
                labels.push(None);
            }

            clock = advance(current, *duration);
            if clock.is_none() {
                tracing::warn!(
                    position = index + 1,
                    duration_ms = *duration,
                    "track runs past the schedulable range, later start times left blank"
                );
            }
        }

        labels
    }

    /// First interval boundary strictly after the start time
    fn first_mark(&self) -> NaiveDateTime {
        let minutes = self.start.hour() * 60 + self.start.minute();
        let next = (minutes / self.interval_minutes + 1) * self.interval_minutes;
        NaiveDateTime::new(NaiveDate::default(), NaiveTime::MIN) + Duration::minutes(i64::from(next))
    }
}

fn advance(clock: NaiveDateTime, duration_ms: u64) -> Option<NaiveDateTime> {
    let millis = i64::try_from(duration_ms).ok()?;
    clock.checked_add_signed(Duration::try_milliseconds(millis)?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FOUR_MINUTES: u64 = 4 * 60 * 1000;

    fn at(value: &str) -> NaiveTime {
        Schedule::parse_start(value).unwrap()
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(at("20:20"), NaiveTime::from_hms_opt(20, 20, 0).unwrap());
        assert!(matches!(
            Schedule::parse_start("8pm"),
            Err(CheckError::InvalidScheduleTime { .. })
        ));
    }

    #[test]
    fn test_first_and_last_get_exact_times() {
        let schedule = Schedule::new(at("20:20"));
        let labels = schedule.annotate(&[FOUR_MINUTES, FOUR_MINUTES]);

        assert_eq!(labels, vec![Some("20:20".to_string()), Some("20:24".to_string())]);
    }

    #[test]
    fn test_interval_marks() {
        // starts 20:20, 20:24, 20:28, 20:32, 20:36, 20:40, 20:44, 20:48, 20:52
        let schedule = Schedule::new(at("20:20"));
        let labels = schedule.annotate(&[FOUR_MINUTES; 9]);

        let expected: Vec<Option<String>> = [
            Some("20:20"),
            None,
            None,
            Some("20:30"),
            None,
            None,
            None,
            Some("20:45"),
            Some("20:52"),
        ]
        .iter()
        .map(|l| l.map(str::to_string))
        .collect();

        assert_eq!(labels, expected);
    }

    #[test]
    fn test_start_on_a_mark_waits_for_the_next_one() {
        let schedule = Schedule::new(at("20:15"));
        let labels = schedule.annotate(&[FOUR_MINUTES; 6]);

        // 20:15, 20:19, 20:23, 20:27, 20:31, 20:35
        assert_eq!(labels[1], None);
        assert_eq!(labels[4], Some("20:30".to_string()));
    }

    #[test]
    fn test_at_most_one_mark_per_track() {
        // a 40 minute track skips over two marks, they are emitted one per row
        let schedule = Schedule::new(at("20:20"));
        let labels = schedule.annotate(&[40 * 60 * 1000, FOUR_MINUTES, FOUR_MINUTES, FOUR_MINUTES]);

        assert_eq!(labels[1], Some("20:30".to_string()));
        assert_eq!(labels[2], Some("20:45".to_string()));
        assert_eq!(labels[3], Some("21:08".to_string()));
    }

    #[test]
    fn test_break_shifts_following_tracks() {
        let schedule = Schedule::new(at("20:20")).with_break(1, 5);
        let labels = schedule.annotate(&[FOUR_MINUTES, FOUR_MINUTES]);

        assert_eq!(labels[1], Some("20:29".to_string()));
    }

    #[test]
    fn test_crossing_midnight() {
        let schedule = Schedule::new(at("23:50"));
        let labels = schedule.annotate(&[20 * 60 * 1000, FOUR_MINUTES, FOUR_MINUTES]);

        assert_eq!(labels[1], Some("00:00".to_string()));
        assert_eq!(labels[2], Some("00:14".to_string()));
    }

    #[test]
    fn test_from_config() {
        let config = ScheduleConfig {
            start: "21:00".to_string(),
            interval_minutes: 30,
            break_before: Some(14),
            break_minutes: 5,
        };
        let schedule = Schedule::from_config(&config).unwrap();

        assert_eq!(schedule.start(), at("21:00"));
        assert_eq!(schedule.first_mark().time(), at("21:30"));
    }

    #[test]
    fn test_oversized_duration_blanks_the_rest() {
        let schedule = Schedule::new(at("20:20"));
        let labels = schedule.annotate(&[u64::MAX, 1000, 1000]);

        assert_eq!(labels, vec![Some("20:20".to_string()), None, None]);
    }

    #[test]
    fn test_duration_past_the_calendar_blanks_the_rest() {
        // fits in i64 milliseconds but not in chrono's date range
        let schedule = Schedule::new(at("20:20"));
        let labels = schedule.annotate(&[FOUR_MINUTES, i64::MAX as u64, FOUR_MINUTES]);

        assert_eq!(labels, vec![Some("20:20".to_string()), None, None]);
    }

    #[test]
    fn test_empty_playlist() {
        assert!(Schedule::new(at("20:20")).annotate(&[]).is_empty());
    }
}
