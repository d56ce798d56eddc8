//! Pure schedule evaluation (§4.1): given a candidate delivery instant and a
//! subscription's weekly window, find the next instant that instant's
//! delivery is actually allowed.
//!
//! No I/O, no clock dependency beyond the candidate itself — this is a pure
//! function over integers, which is what makes the throttling engine able
//! to call it synchronously in the middle of an otherwise-async pipeline.

use moira_common::Schedule;

use crate::error::ScheduleError;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_DAY: i64 = 86_400;
/// UNIX epoch (1970-01-01) was a Thursday; Monday-indexed weekday 3.
const EPOCH_WEEKDAY: i64 = 3;
/// §4.1 step 5: look no further than the next eight days before giving up.
const LOOKAHEAD_DAYS: i64 = 8;

/// Find the next instant `candidate` (or later) falls inside `schedule`'s
/// allowed weekly window, per §4.1.
///
/// # Errors
/// [`ScheduleError::InvalidMaskLength`] if `schedule.days` is neither empty
/// nor length 7. [`ScheduleError::NoAllowedWindow`] if no day in the next
/// eight days has an enabled, not-yet-passed window.
pub fn next_allowed(candidate: i64, schedule: &Schedule) -> Result<i64, ScheduleError> {
    if schedule.days.is_empty() {
        return Ok(candidate);
    }
    if schedule.days.len() != 7 {
        return Err(ScheduleError::InvalidMaskLength(schedule.days.len()));
    }

    let tz_offset_secs = schedule.timezone_offset * SECONDS_PER_MINUTE;
    let local = candidate - tz_offset_secs;
    let local_minute = local.div_euclid(SECONDS_PER_MINUTE) * SECONDS_PER_MINUTE;
    let day_start = local_minute.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY;

    let weekday = weekday_of(day_start);
    let window_start = day_start + schedule.start_offset * SECONDS_PER_MINUTE;
    let window_end = day_start + schedule.end_offset * SECONDS_PER_MINUTE;

    if schedule.days[weekday] && local_minute >= window_start && local_minute <= window_end {
        return Ok(candidate);
    }

    for offset in 0..LOOKAHEAD_DAYS {
        let candidate_day_start = day_start + offset * SECONDS_PER_DAY;
        let candidate_weekday = weekday_of(candidate_day_start);
        let candidate_window_start = candidate_day_start + schedule.start_offset * SECONDS_PER_MINUTE;

        if schedule.days[candidate_weekday] && candidate_window_start >= local_minute {
            return Ok(candidate_window_start + tz_offset_secs);
        }
    }

    Err(ScheduleError::NoAllowedWindow)
}

/// Monday=0 … Sunday=6 weekday of a UNIX timestamp truncated to midnight.
fn weekday_of(day_start_secs: i64) -> usize {
    let day_index = day_start_secs.div_euclid(SECONDS_PER_DAY);
    (day_index + EPOCH_WEEKDAY).rem_euclid(7) as usize
}
