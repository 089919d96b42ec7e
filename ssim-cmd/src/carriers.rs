use std::{
    io::{stdout, Write},
    path::Path,
};

use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use serde::Serialize;
use ssim::carriers::{CarrierNames, CarrierSummary};
use tracing::warn;

use crate::read_payload;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Carrier {
    code: String,
    name: Option<String>,
    flights: usize,
}

#[derive(Debug, Clone, Serialize)]
struct Listing {
    filename: String,
    total_carriers: usize,
    total_flights: usize,
    carriers: Vec<Carrier>,
}

/// Carrier names, or an empty table if `path` is not given or cannot be loaded.
pub fn load_names(path: Option<&Path>) -> CarrierNames {
    let Some(path) = path else {
        return CarrierNames::default();
    };
    match CarrierNames::with_file(path) {
        Ok(names) => names,
        Err(err) => {
            warn!("failed to load carrier names from {path:?}: {err}; listing codes only");
            CarrierNames::default()
        }
    }
}

fn list(fpath: &Path, names: &CarrierNames) -> Result<Listing> {
    let lines = read_payload(fpath)?;
    let summary = CarrierSummary::from_lines(&lines);

    Ok(Listing {
        filename: fpath.to_string_lossy().to_string(),
        total_carriers: summary.iter().count(),
        total_flights: summary.total(),
        carriers: summary
            .iter()
            .map(|(code, flights)| Carrier {
                code: code.to_string(),
                name: names.get(code).map(str::to_string),
                flights,
            })
            .collect(),
    })
}

pub fn carriers(fpath: &Path, airlines: Option<&Path>, format: &Format) -> Result<()> {
    let names = load_names(airlines);
    let listing = list(fpath, &names)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &listing).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&listing).context("serializing listing")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(listing: &Listing) -> Result<String> {
    handlebars_helper!(right_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or(usize::MAX).max(v.len());
        format!("{v:<num$}")
    });
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or(usize::MAX).max(v.len());
        format!("{v:>num$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_helper("rpad", Box::new(right_pad));
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("carriers", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("carriers", &listing).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================================
Carriers: {{ total_carriers }}
Flights:  {{ total_flights }}
-----------------------------------------------------------------------------------------------
Code  Name                                                                            Flights
-----------------------------------------------------------------------------------------------
{{ #each carriers }}{{ rpad 4 code }}  {{ rpad 70 name }}  {{ lpad 13 flights }}
{{/each }}
";
