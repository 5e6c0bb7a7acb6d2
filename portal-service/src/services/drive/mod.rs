//! Remote storage collaborator: a read-only view of a Drive folder tree.
//!
//! The trait seam lets the aggregator and the tests run against an
//! in-memory tree while production talks to the Drive v3 REST API.

pub mod google;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Drive auth failed: {0}")]
    Auth(String),

    #[error("Drive API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// One entry in a folder listing.
#[derive(Debug, Clone)]
pub struct DriveEntry {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl DriveEntry {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }
}

#[async_trait]
pub trait DriveClient: Send + Sync {
    /// List the direct children (id, name, content type) of a folder.
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveEntry>, DriveError>;

    /// Fetch the raw bytes of a file.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError>;

    /// Fetch a cloud-native document through the plain-text export path.
    async fn export_text(&self, file_id: &str) -> Result<Vec<u8>, DriveError>;
}
