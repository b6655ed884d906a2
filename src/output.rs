//! Output types produced by the pipeline stages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lightweight metadata derived from extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Form-feed count + 1; always ≥ 1.
    pub page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Plain text returned by the conversion service plus derived metadata.
///
/// Held only for the duration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Field name → value record parsed from the completion response.
///
/// No schema is enforced; see [`crate::drafts`] for lenient mapping onto
/// the property and tenant forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionResult(Map<String, Value>);

impl ExtractionResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<ExtractionResult> for Value {
    fn from(result: ExtractionResult) -> Self {
        Value::Object(result.0)
    }
}
