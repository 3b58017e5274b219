//! Host lifecycle boundary.
//!
//! Maps the bundler's hooks (build start, module-id resolution, load,
//! transform) onto the build core. The host constructs one [`GoWasmPlugin`]
//! per build session, calls [`GoWasmPlugin::build_start`] before anything
//! else, and may then call the per-module hooks concurrently.

use crate::build::{self, CompilerReporter, SOURCE_EXTENSION};
use crate::config::{
    self, BuilderConfig, BuilderOptions, ConfigError, TransformerConfig, TransformerOptions,
};
use crate::loader;
use crate::transform::{self, AssetEmitter, GeneratedModule, SideEffects};
use anyhow::{Result, anyhow};
use std::path::Path;

fn has_source_extension(id: &str) -> bool {
    Path::new(id)
        .extension()
        .is_some_and(|ext| ext == SOURCE_EXTENSION)
}

pub struct GoWasmPlugin {
    builder_options: Option<BuilderOptions>,
    transformer_options: Option<TransformerOptions>,
    builder_config: Option<BuilderConfig>,
    transformer_config: Option<TransformerConfig>,
}

impl GoWasmPlugin {
    pub fn new(builder: Option<BuilderOptions>, transformer: Option<TransformerOptions>) -> Self {
        GoWasmPlugin {
            builder_options: builder,
            transformer_options: transformer,
            builder_config: None,
            transformer_config: None,
        }
    }

    /// Resolve both configurations. Must complete before any `load` or
    /// `transform` call; a failure here aborts the whole build session.
    pub fn build_start(&mut self) -> Result<(), ConfigError> {
        self.builder_config = Some(config::resolve_builder_options(self.builder_options.as_ref())?);
        self.transformer_config = Some(config::resolve_transformer_options(
            self.transformer_options.as_ref(),
        )?);
        Ok(())
    }

    fn builder_config(&self) -> Result<&BuilderConfig> {
        self.builder_config
            .as_ref()
            .ok_or_else(|| anyhow!("build_start must complete before per-module hooks run"))
    }

    fn transformer_config(&self) -> Result<&TransformerConfig> {
        self.transformer_config
            .as_ref()
            .ok_or_else(|| anyhow!("build_start must complete before per-module hooks run"))
    }

    /// Intercept the well-known virtual specifier for the runtime shim.
    pub fn resolve_id(&self, source: &str) -> Option<String> {
        if source == loader::WASM_EXEC_VIRTUAL_PATH {
            Some(loader::resolved_wasm_exec_id())
        } else {
            None
        }
    }

    /// Serve the shim virtual module, and an empty placeholder for any module
    /// with the recognized source extension (its real content is produced by
    /// the transform step).
    pub fn load(&self, id: &str) -> Result<Option<GeneratedModule>> {
        if id == loader::resolved_wasm_exec_id() {
            return loader::load_wasm_exec(self.transformer_config()?).map(Some);
        }

        if has_source_extension(id) {
            return Ok(Some(GeneratedModule {
                code: String::new(),
                side_effects: SideEffects::Default,
            }));
        }

        Ok(None)
    }

    /// Compile and transform one module. The compiler invocation settles
    /// before the artifact transform begins; a failure affects only this
    /// module's build.
    pub fn transform<R: CompilerReporter, E: AssetEmitter>(
        &self,
        id: &str,
        reporter: &R,
        emitter: &E,
    ) -> Result<Option<GeneratedModule>> {
        if !has_source_extension(id) {
            return Ok(None);
        }

        let module_id = Path::new(id);
        let artifact = build::build(module_id, self.builder_config()?, reporter)?;
        let module = transform::transform(&artifact, module_id, self.transformer_config()?, emitter)?;
        Ok(Some(module))
    }
}
