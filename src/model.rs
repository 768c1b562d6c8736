use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDigest {
    pub role: String,
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPaths {
    pub work_root: String,
    pub out_dir: String,
    pub dict_xml: String,
    pub corpus_xml: Option<String>,
    pub version_file: String,
}

/// Written to `update_run.json` after every pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub lang: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub requested_stages: Vec<String>,
    pub completed_stages: Vec<String>,
    pub skipped_stages: Vec<String>,
    pub failed_stage: Option<String>,
    pub failure_reason: Option<String>,
    pub elapsed_ms: u128,
    pub version: Option<String>,
    pub artifact: Option<String>,
    pub command: String,
    pub paths: RunPaths,
    pub source_hashes: Vec<SourceDigest>,
}
