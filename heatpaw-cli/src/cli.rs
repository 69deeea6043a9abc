use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use heatpaw_core::{
    Config, FileSettings, HeatPaw, LocationConfig, LocationHint, PawMethod, PawVerdict,
    PostalCode, WalkDetails, WeatherSnapshot, paw_check::HOLD_THRESHOLD,
};
use inquire::{Confirm, CustomType, Password, Text};
use tokio::sync::mpsc;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "heatpaw", version, about = "Is it too hot to walk the dog?")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Args)]
pub struct Source {
    /// 5-digit US ZIP code, used when device location is unavailable.
    #[arg(long)]
    zip: Option<String>,

    /// Skip live sources and use synthetic conditions.
    #[arg(long, conflicts_with = "zip")]
    synthetic: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure API key, default ZIP code and location.
    Configure,

    /// Show current conditions, heat risk and suggested walk times.
    Check {
        #[command(flatten)]
        source: Source,
    },

    /// Test whether the pavement is cool enough for paws.
    Paw {
        #[command(subcommand)]
        method: PawCommand,
    },

    /// Check conditions, test the surface and log the walk.
    Walk {
        #[command(flatten)]
        source: Source,

        /// Thermometer reading in °F; runs the 7-second hand test when absent.
        #[arg(long)]
        reading: Option<String>,

        /// Walk length in minutes.
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        notes: Option<String>,

        /// Do not ask for confirmation in dangerous conditions.
        #[arg(long)]
        yes: bool,
    },

    /// List logged walks, newest first.
    History {
        /// Print the log as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete all logged walks.
    ClearHistory {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum PawCommand {
    /// Hold the back of your hand on the pavement; press Enter if it gets too hot.
    Timer,

    /// Enter a surface temperature from an infrared thermometer.
    Reading {
        /// Surface temperature in °F.
        temperature: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure()?,
            Command::Check { source } => {
                let (config, service) = open_service()?;
                let snapshot = acquire(&service, &config, &source).await?;
                output::print_snapshot(&snapshot);
            }
            Command::Paw { method } => {
                let (_, service) = open_service()?;
                let verdict = paw_check(&service, method.reading()).await?;
                output::print_verdict(&verdict);
            }
            Command::Walk { source, reading, duration, notes, yes } => {
                let (config, service) = open_service()?;
                let snapshot = acquire(&service, &config, &source).await?;
                output::print_snapshot(&snapshot);

                if snapshot.heat.risk_tier.needs_confirmation() && !yes {
                    let go_on = Confirm::new(
                        "Current conditions are dangerous for walking. Continue with the paw check?",
                    )
                    .with_default(false)
                    .prompt()?;
                    if !go_on {
                        return Ok(());
                    }
                }

                let verdict = paw_check(&service, reading.as_deref()).await?;
                output::print_verdict(&verdict);

                let details = WalkDetails { duration_minutes: duration, notes };
                match service.record_walk(&snapshot, &verdict, details) {
                    Some(entry) => println!("Logged walk ({}).", entry.risk.as_str().to_uppercase()),
                    None => println!("Walk was not logged: conditions contained invalid readings."),
                }
            }
            Command::History { json } => {
                let (_, service) = open_service()?;
                let entries = service.history();
                if json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                } else {
                    output::print_history(&entries);
                }
            }
            Command::ClearHistory { yes } => {
                let (_, service) = open_service()?;
                if yes || Confirm::new("Delete all logged walks?").with_default(false).prompt()? {
                    service.clear_history();
                    println!("Walk history cleared.");
                }
            }
        }

        Ok(())
    }
}

/// Load the config and wire the service with the on-disk walk log.
fn open_service() -> Result<(Config, HeatPaw)> {
    let config = Config::load()?;
    let settings = FileSettings::open(Config::settings_file_path()?)
        .context("Failed to open walk log storage")?;
    let service = HeatPaw::from_config(&config, settings)?;
    Ok((config, service))
}

impl PawCommand {
    fn reading(&self) -> Option<&str> {
        match self {
            PawCommand::Timer => None,
            PawCommand::Reading { temperature } => Some(temperature),
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key (leave empty to keep current):")
        .without_confirmation()
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let current_zip = config.postal_code.as_ref().map(ToString::to_string).unwrap_or_default();
    let zip = Text::new("Default ZIP code (empty for none):")
        .with_initial_value(&current_zip)
        .with_validator(|input: &str| {
            if input.trim().is_empty() || input.parse::<PostalCode>().is_ok() {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid("Expected exactly 5 digits".into()))
            }
        })
        .prompt()?;
    config.postal_code = if zip.trim().is_empty() { None } else { Some(zip.parse()?) };

    if Confirm::new("Use a fixed location for device coordinates?")
        .with_default(config.location.is_some())
        .prompt()?
    {
        let latitude = CustomType::<f64>::new("Latitude:").prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:").prompt()?;
        config.location = Some(LocationConfig { latitude, longitude });
    } else {
        config.location = None;
    }

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn acquire(service: &HeatPaw, config: &Config, source: &Source) -> Result<WeatherSnapshot> {
    if source.synthetic {
        return Ok(service.acquire(&LocationHint::synthetic()).await?);
    }

    let zip = source
        .zip
        .clone()
        .or_else(|| config.postal_code.as_ref().map(ToString::to_string));
    Ok(service.acquire_current(zip.as_deref()).await?)
}

async fn paw_check(service: &HeatPaw, reading: Option<&str>) -> Result<PawVerdict> {
    if let Some(raw) = reading {
        service.start_paw_check(PawMethod::DirectReading);
        return Ok(service.submit_direct_reading(raw)?);
    }

    let Some(handle) = service.start_paw_check(PawMethod::TimedHoldTest) else {
        bail!("timed paw check did not start");
    };

    println!("Place the back of your hand on the pavement.");
    println!("Press Enter as soon as it feels too hot. Hold for {HOLD_THRESHOLD} seconds to pass.");

    let mut progress = handle.progress();
    let mut enter = spawn_enter_listener();
    let verdict = handle.verdict();
    tokio::pin!(verdict);
    let mut aborted = false;

    loop {
        tokio::select! {
            result = &mut verdict => {
                println!();
                return Ok(result);
            }
            Ok(()) = progress.changed() => {
                output::print_progress(*progress.borrow_and_update(), HOLD_THRESHOLD);
            }
            Some(()) = enter.recv(), if !aborted => {
                aborted = service.abort_paw_check();
            }
        }
    }
}

/// Stdin is read on a plain thread so a pending read never holds up exit.
fn spawn_enter_listener() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        while matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            if tx.send(()).is_err() {
                break;
            }
            line.clear();
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definitions_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_subcommand_parses() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap().command;

        assert!(matches!(parse(&["heatpaw", "configure"]), Command::Configure));
        assert!(matches!(
            parse(&["heatpaw", "check", "--zip", "78701"]),
            Command::Check { source: Source { zip: Some(_), synthetic: false } }
        ));
        assert!(matches!(
            parse(&["heatpaw", "paw", "reading", "118"]),
            Command::Paw { method: PawCommand::Reading { .. } }
        ));
        assert!(matches!(
            parse(&["heatpaw", "walk", "--synthetic", "--reading", "100", "--duration", "20", "--yes"]),
            Command::Walk { duration: Some(20), yes: true, .. }
        ));
        assert!(matches!(parse(&["heatpaw", "history", "--json"]), Command::History { json: true }));
        assert!(matches!(parse(&["heatpaw", "clear-history"]), Command::ClearHistory { yes: false }));
    }

    #[test]
    fn zip_and_synthetic_conflict() {
        assert!(Cli::try_parse_from(["heatpaw", "check", "--zip", "78701", "--synthetic"]).is_err());
    }

    #[test]
    fn paw_reading_is_passed_through() {
        assert_eq!(PawCommand::Timer.reading(), None);
        let reading = PawCommand::Reading { temperature: "118".into() };
        assert_eq!(reading.reading(), Some("118"));
    }
}
