//! Shared working-directory configuration.

use serde::{Deserialize, Serialize};

/// Settings for the working directory that holds per-job subtrees.
///
/// Multiple service instances may point at the same root; the cleanup
/// scheduler tolerates peers deleting the same subtree first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkDirConfig {
    /// Root directory under which every rendering job gets its own subtree.
    #[serde(default = "default_root")]
    pub root: String,
    /// File-name prefix identifying job subtrees within the root.
    #[serde(default = "default_job_prefix")]
    pub job_prefix: String,
}

impl Default for WorkDirConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            job_prefix: default_job_prefix(),
        }
    }
}

fn default_root() -> String {
    "data/work".to_string()
}

fn default_job_prefix() -> String {
    "pdfgen".to_string()
}
