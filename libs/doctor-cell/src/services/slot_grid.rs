use chrono::{Duration, NaiveTime};

use crate::models::{Doctor, Slot, TimeWindow};

/// The one place the bookable time grid is defined. Callers must never
/// hardcode slot lists; a doctor either gets the standard daily grid or the
/// grid derived from their own `available_time_slots` windows.
pub struct SlotGrid;

pub const SLOT_STEP_MINUTES: i64 = 30;

impl SlotGrid {
    /// Ordered bookable slots for a single calendar day. Total for any valid
    /// doctor: never fails, never performs I/O.
    pub fn daily_slots(doctor: &Doctor) -> Vec<Slot> {
        match &doctor.available_time_slots {
            Some(windows) if !windows.is_empty() => Self::slots_from_windows(windows),
            _ => Self::standard_slots(),
        }
    }

    /// The standard daily grid: 09:00..=12:30 and 14:00..=17:00 at 30-minute
    /// steps, 15 slots, lunch gap between 12:30 and 14:00.
    pub fn standard_slots() -> Vec<Slot> {
        Self::slots_from_windows(&Self::standard_windows())
    }

    pub fn standard_windows() -> Vec<TimeWindow> {
        let window = |sh, sm, eh, em| TimeWindow {
            start: NaiveTime::from_hms_opt(sh, sm, 0).expect("valid grid time"),
            end: NaiveTime::from_hms_opt(eh, em, 0).expect("valid grid time"),
        };
        vec![window(9, 0, 12, 30), window(14, 0, 17, 0)]
    }

    /// Whether `slot` is offered by this doctor's grid.
    pub fn contains(doctor: &Doctor, slot: &Slot) -> bool {
        Self::daily_slots(doctor).iter().any(|s| s == slot)
    }

    /// Expand start/end windows into slot start times at 30-minute steps.
    /// Window ends are inclusive: they name the last bookable start time.
    fn slots_from_windows(windows: &[TimeWindow]) -> Vec<Slot> {
        let mut slots = Vec::new();
        for window in windows {
            let mut current = window.start;
            while current <= window.end {
                slots.push(Slot::from_time(current));
                match current.overflowing_add_signed(Duration::minutes(SLOT_STEP_MINUTES)) {
                    (next, 0) => current = next,
                    // Wrapped past midnight, window is exhausted
                    _ => break,
                }
            }
        }
        slots
    }
}
