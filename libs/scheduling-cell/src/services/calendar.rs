// libs/scheduling-cell/src/services/calendar.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};

use crate::models::Slot;

/// Opening hours of the business. All times are in the single fixed business
/// timezone, carried as `DateTime<Utc>` throughout.
#[derive(Debug, Clone)]
pub struct BusinessCalendar {
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub lunch_start_hour: u32,
    pub lunch_end_hour: u32,
    pub slot_minutes: i64,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self {
            opening_hour: 9,
            closing_hour: 20,
            lunch_start_hour: 12,
            lunch_end_hour: 13,
            slot_minutes: 30,
        }
    }
}

impl BusinessCalendar {
    /// True when the instant falls inside [opening, closing) and outside the
    /// lunch break [lunch_start, lunch_end).
    pub fn is_within_operating_hours(&self, at: DateTime<Utc>) -> bool {
        let hour = at.hour();

        if hour < self.opening_hour || hour >= self.closing_hour {
            return false;
        }

        !self.is_lunch_hour(hour)
    }

    fn is_lunch_hour(&self, hour: u32) -> bool {
        hour >= self.lunch_start_hour && hour < self.lunch_end_hour
    }

    /// All slot boundaries of a business day, opening to closing (exclusive),
    /// lunch skipped. Restartable: call again for a fresh iterator.
    pub fn daily_slots(&self, date: NaiveDate) -> impl Iterator<Item = Slot> + '_ {
        let opening = date
            .and_time(NaiveTime::from_hms_opt(self.opening_hour, 0, 0).unwrap_or_default())
            .and_utc();
        let closing = date
            .and_time(NaiveTime::from_hms_opt(self.closing_hour, 0, 0).unwrap_or_default())
            .and_utc();
        let step = self.slot_minutes;

        std::iter::successors(Some(opening), move |prev| Some(*prev + Duration::minutes(step)))
            .take_while(move |at| *at < closing)
            .filter(move |at| !self.is_lunch_hour(at.hour()))
            .map(|at| Slot {
                label: at.format("%H:%M").to_string(),
                starts_at: at,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn rejects_hours_outside_the_operating_window() {
        let calendar = BusinessCalendar::default();

        assert!(!calendar.is_within_operating_hours(at(8, 59)));
        assert!(calendar.is_within_operating_hours(at(9, 0)));
        assert!(calendar.is_within_operating_hours(at(19, 59)));
        assert!(!calendar.is_within_operating_hours(at(20, 0)));
        assert!(!calendar.is_within_operating_hours(at(22, 30)));
    }

    #[test]
    fn rejects_the_lunch_break() {
        let calendar = BusinessCalendar::default();

        assert!(calendar.is_within_operating_hours(at(11, 59)));
        assert!(!calendar.is_within_operating_hours(at(12, 0)));
        assert!(!calendar.is_within_operating_hours(at(12, 30)));
        assert!(calendar.is_within_operating_hours(at(13, 0)));
    }

    #[test]
    fn enumerates_every_half_hour_boundary_outside_lunch() {
        let calendar = BusinessCalendar::default();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        let slots: Vec<Slot> = calendar.daily_slots(date).collect();

        // 9:00..11:30 plus 13:00..19:30, nothing inside [12:00, 13:00).
        assert_eq!(slots.len(), 20);
        assert_eq!(slots.first().unwrap().label, "09:00");
        assert_eq!(slots[5].label, "11:30");
        assert_eq!(slots[6].label, "13:00");
        assert_eq!(slots.last().unwrap().label, "19:30");
        assert!(slots.iter().all(|s| !s.label.starts_with("12:")));
    }

    #[test]
    fn daily_slots_is_restartable() {
        let calendar = BusinessCalendar::default();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        let first: Vec<Slot> = calendar.daily_slots(date).collect();
        let second: Vec<Slot> = calendar.daily_slots(date).collect();

        assert_eq!(first, second);
    }
}
