//! Human-readable rendering of core results.

use std::io::Write;

use chrono::Local;
use heatpaw_core::{PawVerdict, RiskTier, WalkLogEntry, WeatherSnapshot};

pub fn print_snapshot(snapshot: &WeatherSnapshot) {
    println!("{} ({})", snapshot.location, snapshot.condition);
    println!(
        "  Temperature: {:.0}°F   Humidity: {:.0}%",
        snapshot.temperature_f, snapshot.humidity_pct
    );
    println!(
        "  Heat index:  {}°F   Risk: {}",
        snapshot.heat.heat_index_f,
        tier_label(snapshot.heat.risk_tier)
    );
    println!("  {}", snapshot.heat.advisory);

    println!("Safe walk times:");
    for window in &snapshot.walk_windows {
        println!("  • {window}");
    }

    if snapshot.is_synthetic() {
        println!("Note: live weather was unavailable, these are sample conditions.");
    }
}

pub fn print_verdict(verdict: &PawVerdict) {
    let title = if verdict.is_safe { "Safe to Walk" } else { "Too Hot!" };
    println!("{title}: {}", verdict.message());
}

pub fn print_progress(count: u32, threshold: u32) {
    print!("\r  {count}/{threshold}");
    let _ = std::io::stdout().flush();
}

pub fn print_history(entries: &[WalkLogEntry]) {
    if entries.is_empty() {
        println!("No walk history yet. Your completed walks will appear here.");
        return;
    }

    for entry in entries {
        let when = entry.date.with_timezone(&Local).format("%b %d, %Y %-I:%M %p");
        println!("{when}  {}", entry.risk.as_str().to_uppercase());

        let mut details =
            format!("  Temperature {}°F, heat index {}°F", entry.air_temperature_f, entry.heat_index_f);
        if let Some(surface) = entry.surface_temp_f {
            details.push_str(&format!(", surface {surface}°F"));
        }
        println!("{details}");

        if let Some(minutes) = entry.duration_minutes {
            println!("  Duration: {minutes} minutes");
        }
        if let Some(notes) = &entry.notes {
            println!("  {notes}");
        }
    }
}

fn tier_label(tier: RiskTier) -> String {
    tier.as_str().to_uppercase()
}
