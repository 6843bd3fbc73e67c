//! sync of addon variables into the root module
//!
//! For every addon module below [SyncConfig::modules_dir] the [Processor]
//! - reads `<modules_dir>/<module>/<nested_dir>/<module>/variables.tf`
//! - rewrites the lookups of `<target_dir>/<module>.tf` ([Mode::RewriteConsumer] only)
//! - writes `<target_dir>/variables-<module>.tf`
//!
//! Modules are handled one after another. A failing module is logged and counted, the remaining
//! modules are still processed. A fired [Context] stops the whole run.
use crate::context::{Cancelled, Context};
use crate::declaration::{extract_blocks, Declaration, DefaultTable, VARIABLE_BLOCK};
use crate::document::{Document, LoadError, ParseError};
use crate::rewrite::{LookupRewriter, MissingDefault};
use crate::synthesize::synthesize_root_variables;
use std::path::{Path, PathBuf};

pub const SOURCE_VARIABLE_FILE: &str = "variables.tf";

/// Mode of generated and rewritten files
#[cfg(unix)]
pub const TARGET_FILE_MODE: u32 = 0o600;

pub fn consumer_file_name(module_name: &str) -> String {
    format!("{module_name}.tf")
}

pub fn root_variables_file_name(module_name: &str) -> String {
    format!("variables-{module_name}.tf")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Only write the root variable file
    #[default]
    GenerateRootOnly,
    /// Also rewrite the lookups of the consumer file
    RewriteConsumer,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory holding the downloaded modules
    pub modules_dir: PathBuf,
    /// Directory of the root module, where files are written
    pub target_dir: PathBuf,
    /// Directory inside each module that holds its nested addon module
    pub nested_dir: String,
    pub mode: Mode,
    /// Name of the local the rewritten lookups read from (`local.<namespace_key>`)
    pub namespace_key: String,
    pub missing_default: MissingDefault,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            modules_dir: PathBuf::from(".terraform/modules"),
            target_dir: PathBuf::from("."),
            nested_dir: "modules".to_string(),
            mode: Mode::default(),
            namespace_key: "addon".to_string(),
            missing_default: MissingDefault::default(),
        }
    }
}

impl SyncConfig {
    pub fn source_path(&self, module_name: &str) -> PathBuf {
        self.modules_dir
            .join(module_name)
            .join(&self.nested_dir)
            .join(module_name)
            .join(SOURCE_VARIABLE_FILE)
    }

    pub fn consumer_path(&self, module_name: &str) -> PathBuf {
        self.target_dir.join(consumer_file_name(module_name))
    }

    pub fn root_variables_path(&self, module_name: &str) -> PathBuf {
        self.target_dir.join(root_variables_file_name(module_name))
    }
}

/// Decides which module directories are synced
pub trait Discovery: std::fmt::Debug {
    fn accepts(&self, module_name: &str) -> bool;
}

/// Accepts directory names that start with `prefix` and contain no `.`
#[derive(Debug, Clone, derive_new::new)]
pub struct PrefixDiscovery {
    prefix: String,
}

impl Default for PrefixDiscovery {
    fn default() -> Self {
        Self::new("addon".to_string())
    }
}

impl Discovery for PrefixDiscovery {
    fn accepts(&self, module_name: &str) -> bool {
        module_name.starts_with(&self.prefix) && !module_name.contains('.')
    }
}

#[derive(Debug)]
pub struct Processor {
    config: SyncConfig,
    discovery: Box<dyn Discovery>,
}

impl Processor {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            discovery: Box::new(PrefixDiscovery::default()),
        }
    }

    pub fn with_discovery(mut self, discovery: impl Discovery + 'static) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    /// Syncs every discovered module
    ///
    /// A missing modules directory is not an error, there is nothing to sync yet.
    #[tracing::instrument(skip_all, fields(modules_dir = %self.config.modules_dir.display()))]
    pub fn process_modules(&self, ctx: &Context) -> Result<SyncSummary, SyncError> {
        tracing::info!("Starting variable sync from modules");

        let entries = match list_directory(&self.config.modules_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Modules directory not found, skipping sync");
                return Ok(SyncSummary::default());
            }
            Err(source) => {
                return Err(SyncError::ReadDir {
                    path: self.config.modules_dir.clone(),
                    source,
                })
            }
        };

        let mut summary = SyncSummary::default();

        for entry in entries {
            if let Err(cancelled) = ctx.check() {
                tracing::warn!(error = %cancelled, "Processing cancelled");
                return Err(cancelled.into());
            }

            if !entry.is_dir {
                continue;
            }

            let module_name = entry.name;
            if !self.discovery.accepts(&module_name) {
                tracing::debug!(module = %module_name, reason = "does not match criteria", "Skipping entry");
                summary.skipped += 1;
                continue;
            }

            tracing::info!(module = %module_name, "Processing module");
            match self.process_module(ctx, &module_name) {
                Ok(outputs) => summary.push(ModuleReport::processed(module_name, outputs)),
                Err(ModuleError::Cancelled(cancelled)) => {
                    tracing::warn!(module = %module_name, error = %cancelled, "Processing cancelled");
                    return Err(cancelled.into());
                }
                Err(err) => {
                    tracing::error!(
                        module = %module_name,
                        error = %error_chain(&err),
                        "Failed to process module"
                    );
                    summary.push(ModuleReport::failed(module_name, &err));
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            "Variable sync finished"
        );

        if summary.errors > 0 {
            return Err(SyncError::ModulesFailed(summary));
        }

        Ok(summary)
    }

    /// Syncs a single module, returns the written files
    pub fn process_module(
        &self,
        ctx: &Context,
        module_name: &str,
    ) -> Result<Vec<PathBuf>, ModuleError> {
        ctx.check()?;

        let source_path = self.config.source_path(module_name);
        tracing::debug!(source_path = %source_path.display(), "Processing source file");
        let declarations = extract_blocks(&Document::load(&source_path)?, VARIABLE_BLOCK);

        let mut outputs = vec![];

        if self.config.mode == Mode::RewriteConsumer {
            ctx.check()?;
            outputs.push(self.sync_addon_defaults(module_name, &declarations)?);
        }

        ctx.check()?;
        outputs.push(self.sync_addon_variables(module_name, &declarations)?);

        Ok(outputs)
    }

    fn sync_addon_defaults(
        &self,
        module_name: &str,
        declarations: &[Declaration],
    ) -> Result<PathBuf, ModuleError> {
        let path = self.config.consumer_path(module_name);
        let mut consumer = Document::load(&path)?;

        let defaults: DefaultTable = declarations.iter().collect();
        if defaults.is_empty() {
            tracing::warn!(module = module_name, "No variables declared, lookups fall back to null");
        }
        let rewritten = LookupRewriter::new(&defaults, &self.config.namespace_key)
            .with_missing_default(self.config.missing_default)
            .rewrite(&mut consumer);

        write_file(&path, &consumer.to_string())?;
        tracing::info!(
            target_path = %path.display(),
            rewritten,
            defaults = defaults.len(),
            "Successfully wrote addon defaults"
        );
        Ok(path)
    }

    fn sync_addon_variables(
        &self,
        module_name: &str,
        declarations: &[Declaration],
    ) -> Result<PathBuf, ModuleError> {
        let path = self.config.root_variables_path(module_name);

        let rendered = synthesize_root_variables(declarations, module_name)
            .render()
            .map_err(|source| ModuleError::Render {
                path: path.clone(),
                source,
            })?;

        write_file(&path, &rendered)?;
        tracing::info!(target_path = %path.display(), "Successfully wrote addon variables");
        Ok(path)
    }
}

#[derive(Debug)]
struct DirEntry {
    name: String,
    is_dir: bool,
}

/// Entries of `path`, sorted by name
fn list_directory(path: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut entries = vec![];
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: entry.file_type()?.is_dir(),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn write_file(path: &Path, contents: &str) -> Result<(), ModuleError> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(TARGET_FILE_MODE);
    }

    let write_error = |source: std::io::Error| ModuleError::Write {
        path: path.to_owned(),
        source,
    };

    let mut file = options.open(path).map_err(write_error)?;

    // the mode above only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(TARGET_FILE_MODE))
            .map_err(write_error)?;
    }

    file.write_all(contents.as_bytes()).map_err(write_error)
}

/// `err` followed by each of its sources
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SyncSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub modules: Vec<ModuleReport>,
}

impl SyncSummary {
    fn push(&mut self, report: ModuleReport) {
        match report.status {
            ModuleStatus::Processed => self.processed += 1,
            ModuleStatus::Failed => self.errors += 1,
        }
        self.modules.push(report);
    }

    /// Modules that were attempted, skipped ones excluded
    pub fn candidates(&self) -> usize {
        self.processed + self.errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub status: ModuleStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModuleReport {
    fn processed(name: String, outputs: Vec<PathBuf>) -> Self {
        Self {
            name,
            status: ModuleStatus::Processed,
            outputs,
            error: None,
        }
    }

    fn failed(name: String, error: &ModuleError) -> Self {
        Self {
            name,
            status: ModuleStatus::Failed,
            outputs: vec![],
            error: Some(error_chain(error)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Processed,
    Failed,
}

/// Failure of a single module
#[derive(thiserror::Error, Debug)]
pub enum ModuleError {
    #[error("Failed to read file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Failed to render {}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: hcl::Error,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl From<LoadError> for ModuleError {
    fn from(value: LoadError) -> Self {
        match value {
            LoadError::Read { path, source } => ModuleError::Read { path, source },
            LoadError::Parse(err) => ModuleError::Parse(err),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("Failed to read directory {}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("encountered {} error(s) while processing {} module(s)", .0.errors, .0.candidates())]
    ModulesFailed(SyncSummary),
}
