//! Request-scoped operations over the torrc file.
//!
//! Every call loads the file fresh on the blocking pool; nothing is cached
//! between requests. Concurrent writers race and the last save wins.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::json;
use shared::{
    models::{HiddenService, HiddenServicesResponse, TorrcEntryView},
    torrc::{Torrc, TorrcError, validate_option},
};
use tracing::{debug, info, warn};

use crate::http::error::{ApiError, AppResult};

const HOSTNAME_FILE: &str = "hostname";

async fn blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> Result<T, TorrcError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(task).await??)
}

/// Every key/value entry in file order.
pub async fn entries(path: PathBuf) -> AppResult<Vec<TorrcEntryView>> {
    blocking(move || {
        let torrc = Torrc::load(&path)?;
        Ok(torrc
            .pairs()
            .map(|(key, value)| TorrcEntryView {
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect())
    })
    .await
}

/// Validates every update, then applies them in order and saves once.
///
/// Nothing is written when any update is rejected; the error names the key.
pub async fn apply_updates(path: PathBuf, updates: Vec<(String, String)>) -> AppResult<Vec<String>> {
    for (key, value) in &updates {
        if let Err(err) = validate_option(key, value) {
            metrics::counter!("torrc_validation_rejections_total").increment(1);
            warn!(key = %key, error = %err, "rejected torrc update");
            return Err(ApiError::from(err).with_details(json!({ "key": key })));
        }
    }

    let updated = blocking(move || {
        let mut torrc = Torrc::load(&path)?;
        for (key, value) in &updates {
            torrc.set(key, value);
        }
        torrc.save(&path)?;
        Ok(updates.into_iter().map(|(key, _)| key).collect::<Vec<_>>())
    })
    .await?;

    metrics::counter!("torrc_saves_total").increment(1);
    info!(keys = ?updated, "saved torrc");
    Ok(updated)
}

/// Configured hidden services with their published onion hostnames.
pub async fn hidden_services(path: PathBuf) -> AppResult<HiddenServicesResponse> {
    blocking(move || {
        let torrc = Torrc::load(&path)?;
        let dirs = match torrc.hidden_service_dirs() {
            Ok(dirs) => dirs,
            Err(TorrcError::NoSuchKey(_)) => {
                return Ok(HiddenServicesResponse {
                    configured: false,
                    services: Vec::new(),
                });
            }
            Err(err) => return Err(err),
        };

        let services = dirs
            .into_iter()
            .map(|dir| HiddenService {
                dir: dir.to_string(),
                hostname: read_hostname(Path::new(dir)),
            })
            .collect();
        Ok(HiddenServicesResponse {
            configured: true,
            services,
        })
    })
    .await
}

fn read_hostname(dir: &Path) -> Option<String> {
    let path = dir.join(HOSTNAME_FILE);
    match fs::read_to_string(&path) {
        Ok(content) => Some(content.trim().to_string()).filter(|name| !name.is_empty()),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "onion hostname not readable");
            None
        }
    }
}
