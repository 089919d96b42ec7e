use std::{fs::File, io::Write, path::Path, time::Duration};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use ssim::payload::decode_payload;
use tracing::{debug, info};

/// Schedule service endpoint; the season is passed as `ds_temporada`.
pub const DEFAULT_URL: &str = "https://sas.anac.gov.br/sas/siros_api/ssimfile";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upstream responded with HTTP {0}")]
    Status(StatusCode),

    #[error("upstream payload is unusable: {0}")]
    Decode(#[from] ssim::Error),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Transport(err)
        }
    }
}

/// Download the raw payload for `season`, verifying that it decodes to lines.
///
/// Returns the payload text as received and its number of lines.
pub fn fetch_payload(
    url: &str,
    season: &str,
    timeout: Duration,
    insecure: bool,
) -> std::result::Result<(String, usize), FetchError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(FetchError::Transport)?;

    debug!(url, season, ?timeout, insecure, "requesting payload");
    let response = client
        .get(url)
        .query(&[("ds_temporada", season)])
        .send()
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let text = response
        .text()
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;
    let lines = decode_payload(&text)?.len();
    Ok((text, lines))
}

pub fn fetch(
    url: &str,
    season: &str,
    timeout: Duration,
    insecure: bool,
    output: &Path,
) -> Result<()> {
    let (text, lines) = fetch_payload(url, season, timeout, insecure)
        .with_context(|| format!("fetching season {season} from {url}"))?;

    let mut dest =
        File::create(output).with_context(|| format!("failed to create output {output:?}"))?;
    dest.write_all(text.as_bytes())
        .with_context(|| format!("writing {output:?}"))?;

    info!("fetched {lines} lines for season {season} to {output:?}");
    Ok(())
}
