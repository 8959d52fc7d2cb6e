use crate::engine::{Request, load_via};
use crate::error::{HostError, RequestError};
use crate::protocol::{ErrorBody, LoadRequest, LoadResponse};
use crossbeam::channel::Sender;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn load_file(requests: &Sender<Request>, path: &Path) -> Result<LoadResponse, RequestError> {
    let body = fs::read_to_string(path)?;
    let request = LoadRequest::from_json(&body)?;
    load_via(requests, request)
}

/// Load `path` and log the outcome the way a remote caller would see it.
pub fn load_and_report(requests: &Sender<Request>, path: &Path) {
    match load_file(requests, path) {
        Ok(resp) => match serde_json::to_string(&resp) {
            Ok(json) => info!(file = %path.display(), response = %json, "sequence file loaded"),
            Err(e) => warn!(error = %e, "failed to encode load response"),
        },
        Err(e) => {
            let body = ErrorBody::from(&e);
            warn!(file = %path.display(), code = %body.error, message = %body.message, "sequence file rejected");
        }
    }
}

/// Reload `path` every time it is modified. Keep the watcher alive for as
/// long as reloads are wanted.
pub fn watch_sequence_file(requests: Sender<Request>, path: PathBuf) -> Result<RecommendedWatcher, HostError> {
    let watched = path.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if event.kind.is_modify() {
                    info!(file = %watched.display(), "sequence file changed, reloading");
                    load_and_report(&requests, &watched);
                }
            }
            Err(e) => warn!(error = %e, "watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(file = %path.display(), "watching sequence file");
    Ok(watcher)
}
