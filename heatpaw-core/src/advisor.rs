//! Recommended walking windows by air temperature.

/// Suggested walk windows for the given air temperature, earlier window first.
pub fn recommend(temperature_f: f64) -> Vec<String> {
    let windows: &[&str] = if temperature_f < 80.0 {
        &["Anytime is a good time for a walk!"]
    } else if temperature_f < 85.0 {
        &["Early morning (before 10 AM)", "Late evening (after 7 PM)"]
    } else if temperature_f < 95.0 {
        &["Very early morning (before 8 AM)", "Very late evening (after 8 PM)"]
    } else {
        &[
            "Consider indoor activities today.",
            "If you must walk, go before sunrise or after sunset.",
        ]
    };

    windows.iter().map(|w| (*w).to_string()).collect()
}
