use crate::classify::DocumentKind;
use crate::engine::RecognitionMeta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub input: InputInfo,
    pub engine: String,
    pub page_count: u32,
    pub pages: Vec<PageReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    pub path: String,
    pub file_name: String,
    pub file_bytes: u64,
    pub kind: DocumentKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub index: u32,
    pub ok: bool,
    pub chars: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RecognitionMeta>,
}
