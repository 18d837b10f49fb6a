//! Conversion of prompts and uploaded files into model parts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A single part of a generation request, in Gemini wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64-encoded binary content with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl ModelPart {
    pub fn text(text: impl Into<String>) -> Self {
        ModelPart::Text { text: text.into() }
    }

    /// Encode raw bytes as an inline-data part.
    pub fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        ModelPart::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: STANDARD.encode(bytes),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelPart::Text { .. } => "text",
            ModelPart::InlineData { .. } => "inline_data",
        }
    }
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Failed to read upload {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read a file and turn it into an inline-data part. The file is left as is.
pub async fn inline_part_from_file(
    path: &Path,
    mime_type: &str,
) -> Result<ModelPart, PayloadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| PayloadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        path = %path.display(),
        mime_type = %mime_type,
        size = bytes.len(),
        "Encoded upload as inline data"
    );

    Ok(ModelPart::inline(mime_type, &bytes))
}
