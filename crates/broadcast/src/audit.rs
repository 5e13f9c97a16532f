use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use crate::events::{BroadcastEvent, BroadcastObserver};

#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    timestamp: String,
    run_id: Uuid,
    #[serde(flatten)]
    event: &'a BroadcastEvent,
}

/// Appends every event to a JSON-lines file.
pub struct JsonlAuditObserver {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditObserver {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    fn write(&self, run_id: Uuid, event: &BroadcastEvent) -> io::Result<()> {
        let record = AuditRecord {
            timestamp: Utc::now().to_rfc3339(),
            run_id,
            event,
        };
        let json = serde_json::to_string(&record)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit log lock poisoned"))?;
        writeln!(file, "{json}")
    }
}

impl BroadcastObserver for JsonlAuditObserver {
    fn on_event(&self, run_id: Uuid, event: &BroadcastEvent) {
        if let Err(e) = self.write(run_id, event) {
            tracing::warn!(path = %self.path.display(), error = %e, "audit event not written");
            return;
        }
        tracing::trace!(event_type = event.name(), "audit event written");
    }
}
