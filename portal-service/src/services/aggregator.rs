//! Builds a tenant's session context from their Drive folder tree.
//!
//! The whole tree is walked once per session: eligible files are fetched,
//! converted to plain text and concatenated in listing order with per-file
//! headers. A single unreadable file degrades to a placeholder section
//! instead of failing the aggregation.

use crate::services::drive::{DOCX_MIME, DriveClient, DriveEntry, DriveError, GOOGLE_DOC_MIME};
use crate::services::extract;
use metrics::counter;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Subtrees deeper than this are skipped rather than descended into.
pub const MAX_FOLDER_DEPTH: usize = 32;

const SUPPORTED_MIMES: [&str; 4] = ["text/plain", "text/csv", DOCX_MIME, GOOGLE_DOC_MIME];

/// The per-session aggregation output.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    /// Every eligible file rendered as a `=== FILE: <name> ===` section,
    /// sections joined by a blank line.
    pub context: String,
    /// Eligible files processed, placeholders included. Folders don't count.
    pub file_count: usize,
}

pub struct DocumentAggregator {
    drive: Arc<dyn DriveClient>,
}

impl DocumentAggregator {
    pub fn new(drive: Arc<dyn DriveClient>) -> Self {
        Self { drive }
    }

    /// Walk the folder tree and concatenate every eligible file.
    ///
    /// Fails only if the root folder itself cannot be listed; everything
    /// below that degrades per file or per subtree.
    pub async fn aggregate(&self, folder_id: &str) -> Result<ContextBundle, DriveError> {
        let entries = self.collect_files(folder_id).await?;

        let mut sections = Vec::new();
        for entry in entries
            .iter()
            .filter(|e| SUPPORTED_MIMES.contains(&e.mime_type.as_str()))
        {
            let content = self.fetch_text(entry).await;
            sections.push(format!("=== FILE: {} ===\n{}\n", entry.name, content));
        }

        let file_count = sections.len();
        Ok(ContextBundle {
            context: sections.join("\n\n"),
            file_count,
        })
    }

    /// Depth-first, in-order traversal with an explicit frame stack.
    /// Folder entries expand in place; a visited set guards against
    /// cycles and [`MAX_FOLDER_DEPTH`] bounds pathological nesting.
    async fn collect_files(&self, root: &str) -> Result<Vec<DriveEntry>, DriveError> {
        let mut files = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(root.to_string());

        let mut frames: Vec<VecDeque<DriveEntry>> =
            vec![self.drive.list_folder(root).await?.into()];

        while let Some(frame) = frames.last_mut() {
            match frame.pop_front() {
                None => {
                    frames.pop();
                }
                Some(entry) if entry.is_folder() => {
                    if frames.len() >= MAX_FOLDER_DEPTH {
                        tracing::warn!(
                            folder_id = %entry.id,
                            folder_name = %entry.name,
                            "folder depth cap reached, skipping subtree"
                        );
                        continue;
                    }
                    if !visited.insert(entry.id.clone()) {
                        tracing::warn!(folder_id = %entry.id, "folder cycle detected, skipping");
                        continue;
                    }
                    match self.drive.list_folder(&entry.id).await {
                        Ok(children) => frames.push(children.into()),
                        Err(e) => {
                            counter!("portal_aggregation_file_failures_total").increment(1);
                            tracing::warn!(
                                folder_id = %entry.id,
                                error = %e,
                                "failed to list subfolder, skipping subtree"
                            );
                        }
                    }
                }
                Some(entry) => files.push(entry),
            }
        }

        Ok(files)
    }

    /// Fetch one file and convert it to plain text; failures become a
    /// placeholder section so the rest of the context still loads.
    async fn fetch_text(&self, entry: &DriveEntry) -> String {
        let fetched = if entry.mime_type == GOOGLE_DOC_MIME {
            self.drive.export_text(&entry.id).await
        } else {
            self.drive.download(&entry.id).await
        };

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(e) => {
                counter!("portal_aggregation_file_failures_total").increment(1);
                tracing::warn!(file_id = %entry.id, file_name = %entry.name, error = %e, "file fetch failed");
                return format!("[Error reading file: {}]", e);
            }
        };

        match extract::to_plain_text(&entry.mime_type, &bytes) {
            Ok(text) => text,
            Err(e) => {
                counter!("portal_aggregation_file_failures_total").increment(1);
                tracing::warn!(file_id = %entry.id, file_name = %entry.name, error = %e, "file extraction failed");
                format!("[Error reading file: {}]", e)
            }
        }
    }
}
