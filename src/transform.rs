//! Artifact-to-loader transformation.
//!
//! A compiled `.wasm` artifact becomes an ES module that instantiates it
//! inside the Go runtime shim. In `asset` mode the artifact is handed to the
//! bundler as an emitted asset and fetched by its resolved URL; in `inline`
//! mode the bytes are embedded directly as a base64 data URI.

use crate::config::{ConfigError, TransformerConfig};
use crate::helpers;
use crate::loader::WASM_EXEC_VIRTUAL_PATH;
use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use crate::build::ARTIFACT_EXTENSION;

/// How the compiled artifact reaches the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Emit the artifact as a bundler-managed asset, fetched at runtime.
    #[default]
    Asset,
    /// Embed the artifact bytes as a base64 data URI.
    Inline,
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset" => Ok(OutputMode::Asset),
            "inline" => Ok(OutputMode::Inline),
            other => Err(ConfigError::InvalidOutputMode(other.to_string())),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputMode::Asset => write!(f, "asset"),
            OutputMode::Inline => write!(f, "inline"),
        }
    }
}

/// Whether the bundler may tree-shake the module away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffects {
    Default,
    /// The module has observable global effects and must be kept even when
    /// its exports appear unused.
    NoTreeshake,
}

/// Generated module source handed back to the bundler.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedModule {
    pub code: String,
    pub side_effects: SideEffects,
}

/// Sink for emitted build assets. The bundler host registers the asset and
/// returns a reference id the loader code can resolve to a URL at runtime.
pub trait AssetEmitter: Send + Sync {
    fn emit_asset(&self, name: &str, source: Vec<u8>) -> String;
}

/// Writes assets into a directory and uses the file name as the reference id.
/// Used by the CLI, where no bundler host is present.
pub struct FsAssetEmitter {
    assets_dir: PathBuf,
}

impl FsAssetEmitter {
    pub fn new(assets_dir: PathBuf) -> Self {
        FsAssetEmitter { assets_dir }
    }
}

impl AssetEmitter for FsAssetEmitter {
    fn emit_asset(&self, name: &str, source: Vec<u8>) -> String {
        let path = self.assets_dir.join(name);
        if let Err(e) = fs::create_dir_all(&self.assets_dir) {
            log::warn!("Could not create {}: {e}", self.assets_dir.display());
        }
        if let Err(e) = fs::write(&path, source) {
            log::warn!("Could not write asset {}: {e}", path.display());
        }
        name.to_string()
    }
}

/// Records emissions instead of performing them. Test double, same role as a
/// no-op reporter.
#[derive(Default)]
pub struct RecordingEmitter {
    pub emitted: Mutex<Vec<(String, Vec<u8>)>>,
}

impl AssetEmitter for RecordingEmitter {
    fn emit_asset(&self, name: &str, source: Vec<u8>) -> String {
        let mut emitted = self
            .emitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        emitted.push((name.to_string(), source));
        format!("ref{}", emitted.len() - 1)
    }
}

/// Asset name for a module: the module basename with the source extension
/// replaced by the artifact extension.
fn asset_name(module_id: &Path) -> String {
    let basename = module_id.file_name().map(PathBuf::from).unwrap_or_default();
    basename
        .with_extension(ARTIFACT_EXTENSION)
        .to_string_lossy()
        .into_owned()
}

/// Loader module shape shared by both output modes. `fetch_target` is a
/// JavaScript expression, not a string literal.
fn loader_code(fetch_target: &str) -> String {
    format!(
        "import Go from '{WASM_EXEC_VIRTUAL_PATH}'\n\
         \n\
         const result = await WebAssembly.instantiateStreaming(fetch({fetch_target}), Go.importObject)\n\
         export default result\n"
    )
}

/// Turn a compiled artifact into loader module source.
///
/// `Asset` mode performs exactly one asset emission; `Inline` performs none.
/// The output-mode enum is exhaustive, so an unknown mode cannot reach this
/// point — it is rejected during option resolution.
pub fn transform<E: AssetEmitter>(
    artifact: &Path,
    module_id: &Path,
    config: &TransformerConfig,
    emitter: &E,
) -> Result<GeneratedModule> {
    let bytes = helpers::read_file_bytes(artifact)?;

    let code = match config.output_mode {
        OutputMode::Asset => {
            let ref_id = emitter.emit_asset(&asset_name(module_id), bytes);
            loader_code(&format!("import.meta.ROLLUP_FILE_URL_{ref_id}"))
        }
        OutputMode::Inline => {
            let data_uri = format!("data:application/wasm;base64,{}", BASE64.encode(&bytes));
            loader_code(&format!("'{data_uri}'"))
        }
    };

    Ok(GeneratedModule {
        code,
        side_effects: SideEffects::Default,
    })
}
