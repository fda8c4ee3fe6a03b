//! Background playback of recorded message streams.
//!
//! Recordings are `.jsonl` files: one message per line with its topic, the
//! delay to the previous message and a typed payload. The playback thread
//! publishes onto the bus exactly like a live network callback would, and
//! loops until shutdown.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Deserialize;
use vantage_msgs::{InteractiveMarkerInit, InteractiveMarkerUpdate, Value};
use vantage_topics::TopicBus;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RecordKind {
    Plot,
    MarkerInit,
    MarkerUpdate,
}

#[derive(Debug, Deserialize)]
struct RecordLine {
    topic: String,
    kind: RecordKind,
    #[serde(default)]
    dt_ms: u64,
    payload: serde_json::Value,
}

/// Starts the playback thread over all `.jsonl` files under `root`.
pub fn spawn_playback(
    bus: Arc<TopicBus>,
    root: PathBuf,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("playback".to_string())
        .spawn(move || {
            let files = discover(&root);
            if files.is_empty() {
                tracing::warn!(root = %root.display(), "no .jsonl recordings found");
                return;
            }
            tracing::info!(count = files.len(), "playing back recordings");
            while !shutdown.load(Ordering::Relaxed) {
                for file in &files {
                    if let Err(error) = play_file(&bus, file, &shutdown) {
                        tracing::warn!(file = %file.display(), error = %error, "playback failed");
                    }
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                }
            }
        })
        .expect("failed to spawn playback thread")
}

fn discover(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("jsonl"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

fn play_file(bus: &TopicBus, path: &Path, shutdown: &AtomicBool) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(path)?);
    for (number, line) in reader.lines().enumerate() {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(());
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Malformed lines are skipped, not fatal for the whole recording.
        let record: RecordLine = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(line = number + 1, %error, "skipping malformed record");
                continue;
            }
        };
        if record.dt_ms > 0 {
            thread::sleep(Duration::from_millis(record.dt_ms.min(5_000)));
        }
        publish(bus, record);
    }
    Ok(())
}

fn publish(bus: &TopicBus, record: RecordLine) {
    match record.kind {
        RecordKind::Plot => bus.publish(&record.topic, json_to_value(record.payload)),
        RecordKind::MarkerInit => {
            match serde_json::from_value::<InteractiveMarkerInit>(record.payload) {
                Ok(message) => bus.publish(&record.topic, message),
                Err(error) => tracing::warn!(%error, "bad marker init payload"),
            }
        }
        RecordKind::MarkerUpdate => {
            match serde_json::from_value::<InteractiveMarkerUpdate>(record.payload) {
                Ok(message) => bus.publish(&record.topic, message),
                Err(error) => tracing::warn!(%error, "bad marker update payload"),
            }
        }
    }
}

/// Converts a JSON tree into the dynamic message value the plot queries
/// evaluate against.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::I64(i),
            None => Value::F64(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => {
            Value::Seq(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(fields) => {
            let map: BTreeMap<String, Value> = fields
                .into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect();
            Value::Map(map)
        }
    }
}
