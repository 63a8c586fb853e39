//! Human-readable formatting helpers shared by exports and the CLI.

/// Timestamp layout used in listings and exports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a duration in seconds, e.g. "3 minutes 5.0 seconds"
///
/// The value is rounded to the displayed precision before choosing a range,
/// so 59.999 seconds reads "1 minutes 0.0 seconds" rather than "60.00 seconds".
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);

    let hundredths = (seconds * 100.0).round() as u64;
    if hundredths < 6_000 {
        return format!("{}.{:02} seconds", hundredths / 100, hundredths % 100);
    }

    let tenths = (seconds * 10.0).round() as u64;
    if tenths < 36_000 {
        let remaining = tenths % 600;
        return format!(
            "{} minutes {}.{} seconds",
            tenths / 600,
            remaining / 10,
            remaining % 10
        );
    }

    let minutes = tenths / 600;
    format!("{} hours {} minutes", minutes / 60, minutes % 60)
}

/// Upper-case the first letter of every word ("square root" -> "Square Root")
pub fn title_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut at_word_start = true;
    for c in label.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_ranges() {
        assert_eq!(format_duration(0.0), "0.00 seconds");
        assert_eq!(format_duration(12.346), "12.35 seconds");
        assert_eq!(format_duration(185.0), "3 minutes 5.0 seconds");
        assert_eq!(format_duration(7440.0), "2 hours 4 minutes");
    }

    #[test]
    fn test_format_duration_carries_at_boundaries() {
        assert_eq!(format_duration(59.994), "59.99 seconds");
        assert_eq!(format_duration(59.999), "1 minutes 0.0 seconds");
        assert_eq!(format_duration(119.97), "2 minutes 0.0 seconds");
        assert_eq!(format_duration(3599.94), "59 minutes 59.9 seconds");
        assert_eq!(format_duration(3599.96), "1 hours 0 minutes");
        assert_eq!(format_duration(-3.0), "0.00 seconds");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("basic"), "Basic");
        assert_eq!(title_case("square root"), "Square Root");
        assert_eq!(title_case("unit_CONVERSION"), "Unit_Conversion");
        assert_eq!(title_case(""), "");
    }
}
