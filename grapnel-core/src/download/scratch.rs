//! Request-scoped scratch storage with guaranteed-unique names.
//!
//! Temp file names combine the resource id with a per-request token so two
//! concurrent requests for the same resource and role never collide. The
//! scratch space tracks exactly the paths it handed out and removes them
//! best-effort on cleanup.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Role a scratch file plays in one combine request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Video,
    Audio,
    Output,
}

impl StreamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamRole::Video => "video",
            StreamRole::Audio => "audio",
            StreamRole::Output => "output",
        }
    }
}

impl std::fmt::Display for StreamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allocator and cleanup tracker for one request's ephemeral files.
pub struct ScratchSpace {
    root: PathBuf,
    resource: String,
    token: String,
    allocated: Vec<PathBuf>,
}

impl ScratchSpace {
    pub fn new(root: &Path, resource: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            resource: sanitize_component(resource),
            token: Uuid::new_v4().simple().to_string(),
            allocated: Vec::new(),
        }
    }

    /// Hands out a unique path for the given role and records it for cleanup.
    pub fn allocate(&mut self, role: StreamRole, extension: &str) -> PathBuf {
        let name = format!("{}-{}-{}.{extension}", self.resource, self.token, role);
        let path = self.root.join(name);
        self.allocated.push(path.clone());
        path
    }

    /// Removes every allocated path, best-effort.
    ///
    /// A path that was never created is a no-op; removal failures are logged
    /// and never escalate, since the request's fate is already decided by the
    /// time cleanup runs.
    pub async fn cleanup(&mut self) {
        for path in self.allocated.drain(..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!("Removed scratch file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to remove scratch file {}: {e}", path.display());
                }
            }
        }
    }
}

/// Keeps file name components to a safe alphabet.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "resource".to_string()
    } else {
        cleaned
    }
}
