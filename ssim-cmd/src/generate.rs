use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use ssim::{
    assemble::CarrierSelection,
    record::UnclassifiedPolicy,
    timezone::AirportOffsetTable,
    transform::{Outcome, Pipeline, Transformer},
};
use tracing::{debug, info, warn};

use crate::read_payload;

#[derive(Debug, Clone)]
pub enum Unclassified {
    Drop,
    Keep,
}

impl clap::ValueEnum for Unclassified {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Drop, Self::Keep]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Drop => Some(clap::builder::PossibleValue::new("drop")),
            Self::Keep => Some(clap::builder::PossibleValue::new("keep")),
        }
    }
}

impl From<&Unclassified> for UnclassifiedPolicy {
    fn from(value: &Unclassified) -> Self {
        match value {
            Unclassified::Drop => Self::Drop,
            Unclassified::Keep => Self::Keep,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub season: String,
    pub selection: CarrierSelection,
    pub convert_times: bool,
    pub target_dialect: bool,
    pub repeat_carrier: Option<bool>,
    pub target_offset: i32,
    pub airports: Option<PathBuf>,
    pub unclassified: Unclassified,
}

fn load_airports(path: &Path) -> Option<AirportOffsetTable> {
    match AirportOffsetTable::with_file(path) {
        Ok(table) => Some(table),
        Err(err) => {
            warn!("failed to load airports from {path:?}: {err}; using default offsets");
            None
        }
    }
}

/// Generate the document for `input` and write it to `output`, or to a generated
/// file name in the current directory. Returns the path written.
pub fn generate(
    input: &Path,
    opts: &Options,
    output: Option<&Path>,
    clobber: bool,
) -> Result<PathBuf> {
    let lines = read_payload(input)?;
    let airports = match (&opts.airports, opts.convert_times) {
        (Some(path), true) => load_airports(path),
        _ => None,
    };

    let transformer = Transformer::builder()
        .convert_times(opts.convert_times)
        .target_dialect(opts.target_dialect)
        .repeat_carrier(opts.repeat_carrier.unwrap_or(opts.convert_times))
        .target_offset(opts.target_offset)
        .airports(airports.as_ref())
        .build();

    let now = Local::now();
    let generated = Pipeline::builder()
        .selection(opts.selection.clone())
        .transformer(transformer)
        .unclassified((&opts.unclassified).into())
        .issued(now.date_naive())
        .season(opts.season.clone())
        .build()
        .run(&lines);

    let doc = generated.document;
    doc.check().context("generated document is invalid")?;

    let changed = generated.reports.iter().filter(|r| r.changed()).count();
    let skipped = generated
        .reports
        .iter()
        .filter(|r| r.times.contains(&Outcome::Skipped))
        .count();
    debug!(changed, skipped, dropped = generated.dropped, "transform summary");
    if doc.data_lines() == 0 {
        warn!("no flight records for {}", opts.selection);
    }

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(doc.file_name(&now.naive_local())),
    };
    if !clobber && output.exists() {
        anyhow::bail!("{output:?} exists; use --clobber");
    }

    let mut dest =
        File::create(&output).with_context(|| format!("failed to create output {output:?}"))?;
    dest.write_all(&doc.to_bytes())
        .with_context(|| format!("writing {output:?}"))?;

    info!(
        "wrote {} flight records for {} to {output:?}",
        doc.data_lines(),
        opts.selection
    );
    Ok(output)
}
