//! Generator configuration: the input document and one entry per client.
//!
//! ```yaml
//! spec: ./openapi.yaml
//! clients:
//!   - type: typescript
//!     outDir: ./sdk
//!     packageName: my-sdk
//!     name: MyClient
//!     includeTags: ["^users"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::ir::{TagFilter, Target};

/// Contents of `sdkgen.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Local path of the API document, or an http(s) URL kept verbatim.
    #[serde(default)]
    pub spec: String,
    /// Display name of the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// One entry per generated client.
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
}

/// One client to generate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// `typescript`, `typescript-types`, `go` or `python`.
    #[serde(rename = "type", default)]
    pub client_type: String,
    /// Directory the client is written to.
    #[serde(default)]
    pub out_dir: PathBuf,
    /// Package name as the target ecosystem spells it.
    #[serde(default)]
    pub package_name: String,
    /// Go module path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    /// Client class name, also used to select the client.
    #[serde(default)]
    pub name: String,
    /// Regexes; an operation must carry a matching tag.
    #[serde(default)]
    pub include_tags: Vec<String>,
    /// Regexes; an operation carrying a matching tag is dropped.
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    /// Executable run as `<parser> <operationId> <METHOD> <path>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id_parser: Option<PathBuf>,
    /// Program and arguments, run inside `outDir` before generation.
    #[serde(default)]
    pub pre_command: Vec<String>,
    /// Program and arguments, run inside `outDir` after generation.
    #[serde(default)]
    pub post_command: Vec<String>,
}

impl Config {
    /// Read, validate and resolve a YAML configuration file.
    ///
    /// Relative paths are resolved against the directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let config = config.resolved(base)?;
        debug!(
            path = %path.display(),
            spec = %config.spec,
            clients = config.clients.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Configuration for a single client given without a file, with paths
    /// taken relative to the working directory.
    pub fn single(spec: impl Into<String>, client: ClientConfig) -> Result<Self> {
        let config = Self {
            spec: spec.into(),
            name: None,
            clients: vec![client],
        };
        config.validate()?;
        Ok(config)
    }

    /// Check required fields, client types and tag patterns.
    pub fn validate(&self) -> Result<()> {
        if self.spec.trim().is_empty() {
            return Err(Error::MissingConfig("config.spec is required".to_string()));
        }
        for (i, client) in self.clients.iter().enumerate() {
            client.validate(i)?;
        }
        Ok(())
    }

    /// Whether `spec` points at a remote document.
    pub fn spec_is_remote(&self) -> bool {
        is_remote(&self.spec)
    }

    /// `spec` as a local path.
    pub fn spec_path(&self) -> PathBuf {
        PathBuf::from(&self.spec)
    }

    /// Clients to generate: all of them, or the one whose `name` matches.
    pub fn selected_clients(&self, only: Option<&str>) -> Result<Vec<&ClientConfig>> {
        let Some(only) = only else {
            return Ok(self.clients.iter().collect());
        };
        let selected: Vec<&ClientConfig> = self.clients.iter().filter(|c| c.name == only).collect();
        if selected.is_empty() {
            return Err(Error::MissingConfig(format!("no client named {only:?} in config")));
        }
        Ok(selected)
    }

    fn resolved(mut self, base: &Path) -> Result<Self> {
        self.validate()?;
        if !self.spec_is_remote() {
            self.spec = resolve(base, Path::new(&self.spec)).to_string_lossy().into_owned();
        }
        for client in &mut self.clients {
            client.out_dir = resolve(base, &client.out_dir);
            client.operation_id_parser = client
                .operation_id_parser
                .take()
                .map(|parser| resolve(base, &parser));
        }
        Ok(self)
    }
}

impl ClientConfig {
    /// The projection target named by `type`.
    pub fn target(&self) -> Result<Target> {
        self.client_type.parse()
    }

    /// Compiled include/exclude patterns.
    pub fn tag_filter(&self) -> Result<TagFilter> {
        TagFilter::new(&self.include_tags, &self.exclude_tags)
    }

    /// `<outDir>/<stem>.ir.json`, the stem being the last segment of a
    /// slashed package name such as `@org/sdk` or `github.com/org/api`.
    pub fn ir_output_path(&self) -> PathBuf {
        let stem = self
            .package_name
            .rsplit(['/', '\\'])
            .find(|segment| !matches!(*segment, "" | "." | ".."))
            .unwrap_or("client");
        self.out_dir.join(format!("{stem}.ir.json"))
    }

    fn validate(&self, index: usize) -> Result<()> {
        let missing: Vec<&str> = [
            ("type", self.client_type.is_empty()),
            ("outDir", self.out_dir.as_os_str().is_empty()),
            ("packageName", self.package_name.is_empty()),
            ("name", self.name.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();

        if !missing.is_empty() {
            return Err(Error::MissingConfig(format!(
                "clients[{index}] missing required fields: {}",
                missing.join(", ")
            )));
        }

        self.target()?;
        self.tag_filter()?;
        Ok(())
    }
}

fn is_remote(spec: &str) -> bool {
    spec.starts_with("http://") || spec.starts_with("https://")
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
