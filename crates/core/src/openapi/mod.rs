//! OpenAPI document loading.
//!
//! Documents are read from local files as JSON or YAML. Retrieval over the
//! network is not supported.

mod spec;

pub use spec::{
    AdditionalProperties, Components, Discriminator, EnumValue, HttpMethod, Info, MediaType, OpenApiSpec, Operation,
    Parameter, PathItem, RefOr, RequestBody, Response, Schema, SchemaType, SecurityScheme, ref_name,
};

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

impl OpenApiSpec {
    /// Parse an OpenAPI document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Parse an OpenAPI document from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// JSON when the first non-blank character opens an object, YAML otherwise.
    pub fn from_str_auto(text: &str) -> Result<Self> {
        if text.trim_start().starts_with('{') {
            Self::from_json(text)
        } else {
            Self::from_yaml(text)
        }
    }

    /// Load a document from disk, choosing the parser by extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let display = path.to_string_lossy();
        if display.starts_with("http://") || display.starts_with("https://") {
            return Err(Error::Parse(format!(
                "remote documents are not supported, download {display} first"
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let spec = match ext.as_deref() {
            Some("json") => Self::from_json(&text)?,
            Some("yaml" | "yml") => Self::from_yaml(&text)?,
            _ => Self::from_str_auto(&text)?,
        };

        debug!(
            path = %path.display(),
            title = %spec.info.title,
            version = %spec.info.version,
            paths = spec.paths.len(),
            "Loaded API document"
        );
        Ok(spec)
    }

    /// Component schemas, empty when the document declares none.
    pub fn component_schemas(&self) -> impl Iterator<Item = (&String, &Schema)> {
        self.components.iter().flat_map(|c| c.schemas.iter())
    }
}
