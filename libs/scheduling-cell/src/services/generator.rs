// libs/scheduling-cell/src/services/generator.rs
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{ClockTime, TimeSlot, WorkingDayEntry};

/// Materialize concrete time slots for one date from a working-day template.
///
/// Greedy walk: the cursor starts at the opening time and advances in
/// `slot_duration_minutes` steps. A candidate window that would intersect the
/// break is not emitted at all; the cursor jumps to the break end and the
/// walk resumes. A slot can therefore never straddle the break, and no
/// shortened slot is emitted in front of an unaligned break start.
pub fn generate_slots(
    entry: &WorkingDayEntry,
    slot_duration_minutes: u16,
    max_bookings: u32,
) -> Result<Vec<TimeSlot>, ScheduleError> {
    if !entry.is_working {
        return Err(ScheduleError::Validation(format!(
            "Weekday {} is not a working day",
            entry.day_of_week
        )));
    }

    let (start, end) = match (entry.start_time, entry.end_time) {
        (Some(s), Some(e)) => (s.to_minutes(), e.to_minutes()),
        _ => {
            return Err(ScheduleError::Validation(format!(
                "Working day {} has no operating hours configured",
                entry.day_of_week
            )))
        }
    };

    if slot_duration_minutes == 0 || slot_duration_minutes > 24 * 60 {
        return Err(ScheduleError::Validation(
            "slot_duration_minutes must be between 1 and 1440".to_string(),
        ));
    }
    if max_bookings < 1 {
        return Err(ScheduleError::Validation(
            "max_bookings must be at least 1".to_string(),
        ));
    }

    let break_window = match (entry.break_start, entry.break_end) {
        (Some(bs), Some(be)) => Some((bs.to_minutes(), be.to_minutes())),
        _ => None,
    };

    let mut slots = Vec::new();
    let mut cursor = start;

    while cursor + slot_duration_minutes <= end {
        let slot_end = cursor + slot_duration_minutes;

        if let Some((break_start, break_end)) = break_window {
            if cursor < break_end && slot_end > break_start {
                cursor = break_end;
                continue;
            }
        }

        slots.push(TimeSlot {
            id: Uuid::new_v4(),
            start_time: ClockTime::from_minutes(cursor),
            end_time: ClockTime::from_minutes(slot_end),
            max_bookings,
            current_bookings: 0,
            is_available: true,
        });

        cursor = slot_end;
    }

    Ok(slots)
}
