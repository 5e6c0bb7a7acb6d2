//! In-memory Drive tree for tests.

use super::{DriveClient, DriveEntry, DriveError, FOLDER_MIME, GOOGLE_DOC_MIME};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A scriptable folder tree. Files can be marked as failing to exercise
/// the aggregator's per-file degradation path, and every trait call is
/// counted so tests can assert the client was never touched.
#[derive(Default)]
pub struct MockDrive {
    folders: Mutex<HashMap<String, Vec<DriveEntry>>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    exports: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl MockDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an (initially empty) folder.
    pub fn insert_folder(&self, folder_id: &str) {
        self.folders
            .lock()
            .unwrap()
            .entry(folder_id.to_string())
            .or_default();
    }

    /// Add a subfolder entry under `parent` and register it as a folder.
    pub fn insert_subfolder(&self, parent: &str, id: &str, name: &str) {
        self.insert_folder(parent);
        self.insert_folder(id);
        self.folders
            .lock()
            .unwrap()
            .get_mut(parent)
            .unwrap()
            .push(DriveEntry {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: FOLDER_MIME.to_string(),
            });
    }

    /// Add a regular file under `parent` with downloadable content.
    pub fn insert_file(&self, parent: &str, id: &str, name: &str, mime_type: &str, content: &[u8]) {
        self.insert_folder(parent);
        self.folders
            .lock()
            .unwrap()
            .get_mut(parent)
            .unwrap()
            .push(DriveEntry {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: mime_type.to_string(),
            });
        self.contents
            .lock()
            .unwrap()
            .insert(id.to_string(), content.to_vec());
    }

    /// Add a cloud-native document under `parent`, served via export.
    pub fn insert_document(&self, parent: &str, id: &str, name: &str, exported: &[u8]) {
        self.insert_folder(parent);
        self.folders
            .lock()
            .unwrap()
            .get_mut(parent)
            .unwrap()
            .push(DriveEntry {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: GOOGLE_DOC_MIME.to_string(),
            });
        self.exports
            .lock()
            .unwrap()
            .insert(id.to_string(), exported.to_vec());
    }

    /// Make every fetch of `id` fail.
    pub fn fail_file(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    /// Total number of trait calls served.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self, id: &str) -> Result<(), DriveError> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(DriveError::Api {
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DriveClient for MockDrive {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveEntry>, DriveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(folder_id)?;
        self.folders
            .lock()
            .unwrap()
            .get(folder_id)
            .cloned()
            .ok_or_else(|| DriveError::Api {
                status: 404,
                body: format!("unknown folder {}", folder_id),
            })
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(file_id)?;
        self.contents
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| DriveError::Api {
                status: 404,
                body: format!("unknown file {}", file_id),
            })
    }

    async fn export_text(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(file_id)?;
        self.exports
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| DriveError::Api {
                status: 404,
                body: format!("no export for {}", file_id),
            })
    }
}
