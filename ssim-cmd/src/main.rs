mod carriers;
mod fetch;
mod generate;

use std::{
    io::stderr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ssim::{assemble::CarrierSelection, payload::decode_payload, timeconv::TARGET_OFFSET_HOURS};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the schedule payload for a season.
    ///
    /// The payload is written as received. It is a JSON array of records with one
    /// SSIM line each, possibly encoded more than once.
    Fetch {
        /// IATA season, e.g., W25 or S26.
        #[arg(short, long, value_parser = parse_season)]
        season: String,

        /// Schedule service endpoint.
        #[arg(long, default_value = fetch::DEFAULT_URL)]
        url: String,

        /// Request timeout in seconds.
        #[arg(long, default_value_t = fetch::DEFAULT_TIMEOUT_SECS, value_name = "seconds")]
        timeout: u64,

        /// Do not verify the server's TLS certificate.
        #[arg(long, action)]
        insecure: bool,

        /// Delete output file if it already exists
        #[arg(long, action)]
        clobber: bool,

        /// Output file path.
        #[arg(short, long, default_value = "payload.json", value_name = "path")]
        output: PathBuf,
    },
    /// List the carriers that have flight records in a payload.
    Carriers {
        /// Input payload file
        input: PathBuf,

        /// CSV with `IATA Designator` and `Airline Name` columns used for carrier names.
        #[arg(short, long, value_name = "path")]
        airlines: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: carriers::Format,
    },
    /// Generate an SSIM file from a payload.
    Generate {
        /// Input payload file
        input: PathBuf,

        /// IATA season written to the file name, e.g., W25 or S26.
        #[arg(short, long, value_parser = parse_season)]
        season: String,

        /// Carrier code to include, or ALL for every carrier.
        #[arg(short, long, default_value = "ALL")]
        carrier: CarrierSelection,

        /// Convert station times to a fixed UTC offset.
        #[arg(long, action)]
        convert_times: bool,

        /// UTC offset in whole hours times are converted to.
        #[arg(
            long,
            default_value_t = TARGET_OFFSET_HOURS,
            allow_negative_numbers = true,
            value_name = "hours"
        )]
        target_offset: i32,

        /// Repeat the carrier code before the trailing flight designator. Defaults to
        /// the value of --convert-times.
        #[arg(long, value_name = "bool")]
        repeat_carrier: Option<bool>,

        /// Rewrite onward carriage and service information in the target dialect.
        #[arg(long, action)]
        target_dialect: bool,

        /// CSV with `IATA` and `Timezone` columns used for stations whose offset
        /// cannot be read from the record.
        #[arg(long, value_name = "path")]
        airports: Option<PathBuf>,

        /// What to do with lines that are not SSIM records.
        #[arg(long, default_value = "drop")]
        unclassified: generate::Unclassified,

        /// Delete output file if it already exists
        #[arg(long, action)]
        clobber: bool,

        /// Output file path. Defaults to a name describing the selection, season,
        /// time reference and format.
        #[arg(short, long, value_name = "path")]
        output: Option<PathBuf>,
    },
}

fn parse_season(s: &str) -> Result<String, String> {
    let rx = regex::Regex::new(r"^[SW][0-9]{2}$").expect("regex to compile");
    let season = s.trim().to_ascii_uppercase();
    if !rx.is_match(&season) {
        return Err("expected a season such as W25 or S26".to_string());
    }
    Ok(season)
}

/// Read and decode a payload file into raw lines.
fn read_payload(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let lines = decode_payload(&text).with_context(|| format!("decoding payload {path:?}"))?;
    debug!("read {} lines from {path:?}", lines.len());
    Ok(lines)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("SSIM_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Fetch {
            season,
            url,
            timeout,
            insecure,
            clobber,
            output,
        } => {
            if !clobber && output.exists() {
                bail!("{output:?} exists; use --clobber");
            }
            fetch::fetch(
                url,
                season,
                Duration::from_secs(*timeout),
                *insecure,
                output,
            )
        }
        Commands::Carriers {
            input,
            airlines,
            format,
        } => carriers::carriers(input, airlines.as_deref(), format),
        Commands::Generate {
            input,
            season,
            carrier,
            convert_times,
            target_offset,
            repeat_carrier,
            target_dialect,
            airports,
            unclassified,
            clobber,
            output,
        } => {
            info!("generating {season} for {carrier} from {input:?}");
            let opts = generate::Options {
                season: season.clone(),
                selection: carrier.clone(),
                convert_times: *convert_times,
                target_dialect: *target_dialect,
                repeat_carrier: *repeat_carrier,
                target_offset: *target_offset,
                airports: airports.clone(),
                unclassified: unclassified.clone(),
            };
            generate::generate(input, &opts, output.as_deref(), *clobber).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season() {
        assert_eq!(parse_season("w25").unwrap(), "W25");
        assert_eq!(parse_season("S26").unwrap(), "S26");
        assert!(parse_season("X25").is_err());
        assert!(parse_season("W2025").is_err());
    }

    #[test]
    fn cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
