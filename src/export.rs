//! Export collaborator
//!
//! The portal treats export as an opaque collaborator with a stable
//! request/response contract: options in, `{success, filename, downloadUrl?,
//! error?}` out. The built-in implementation dumps the selected sections to a
//! JSON file; anything fancier (templated PDF, cloud delivery) plugs in
//! behind the same trait.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::PersistenceAdapter;
use crate::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Sections to include. Empty means everything.
    #[serde(default)]
    pub sections: Vec<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub success: bool,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportOutcome {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            filename: String::new(),
            download_url: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, owner: &str, options: &ExportOptions) -> ExportOutcome;
}

/// Writes the selected sections as one pretty-printed JSON file under the
/// export directory.
pub struct JsonFileExporter {
    adapter: Arc<PersistenceAdapter>,
    out_dir: PathBuf,
}

impl JsonFileExporter {
    pub fn new(adapter: Arc<PersistenceAdapter>, out_dir: PathBuf) -> Self {
        Self { adapter, out_dir }
    }
}

#[async_trait]
impl Exporter for JsonFileExporter {
    async fn export(&self, owner: &str, options: &ExportOptions) -> ExportOutcome {
        if options.format != ExportFormat::Json {
            return ExportOutcome::failure("only JSON export is supported");
        }

        let sections: Vec<DataType> = if options.sections.is_empty() {
            DataType::ALL.to_vec()
        } else {
            options.sections.clone()
        };

        let mut bundle = serde_json::Map::new();
        for section in &sections {
            let value: Option<serde_json::Value> =
                self.adapter.get(section.collection(), owner).await;
            bundle.insert(
                section.label().to_string(),
                value.unwrap_or(serde_json::Value::Null),
            );
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.out_dir).await {
            return ExportOutcome::failure(format!("could not create export dir: {}", e));
        }

        let filename = format!(
            "custodian-export-{}-{}.json",
            crate::util::slugify(owner),
            Utc::now().format("%Y%m%dT%H%M%S")
        );
        let path = self.out_dir.join(&filename);

        let content = match serde_json::to_string_pretty(&bundle) {
            Ok(c) => c,
            Err(e) => return ExportOutcome::failure(format!("serialize failed: {}", e)),
        };
        if let Err(e) = tokio::fs::write(&path, content).await {
            return ExportOutcome::failure(format!("write failed: {}", e));
        }

        ExportOutcome {
            success: true,
            filename,
            download_url: Some(format!("file://{}", path.display())),
            error: None,
        }
    }
}
