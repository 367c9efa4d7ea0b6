//! Pure countdown helpers for the exam timer display.
//!
//! The session controller owns `remaining_seconds`; everything here is a
//! function of that value so the rendering layer carries no timer logic.

/// Threshold below which the timer display switches to its warning style.
pub const LOW_TIME_THRESHOLD_SECS: u32 = 5 * 60;

/// True when the remaining time should be rendered with the low-time flag.
///
/// The threshold is strictly below five minutes, so a four-minute exam is
/// flagged from its very first render.
#[must_use]
pub fn is_low_time(remaining_seconds: u32) -> bool {
    remaining_seconds < LOW_TIME_THRESHOLD_SECS
}

/// Formats remaining seconds as `HH:MM:SS`.
#[must_use]
pub fn format_clock(remaining_seconds: u32) -> String {
    let hours = remaining_seconds / 3600;
    let minutes = (remaining_seconds % 3600) / 60;
    let seconds = remaining_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_full_clock() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(59), "00:00:59");
        assert_eq!(format_clock(60 * 60 + 61), "01:01:01");
        assert_eq!(format_clock(60 * 240), "04:00:00");
    }

    #[test]
    fn four_minute_exam_is_low_from_first_render() {
        assert!(is_low_time(4 * 60));
    }

    #[test]
    fn five_minutes_exactly_is_not_low() {
        assert!(!is_low_time(5 * 60));
        assert!(is_low_time(5 * 60 - 1));
    }
}
