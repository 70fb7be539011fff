//! Compile files and modules.
//!
//! A [`Module`] is the structured result of running one module definition: a
//! named, versioned set of [`CompileFile`]s plus module-wide compiler flags,
//! include directories and pre-build steps. Every property is append-only;
//! nothing is ever removed or reordered once declared.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::ModuleVersion;
use crate::action::{ActionHandle, ConfigureHook, PrebuildStep};

/// Errors raised by the module model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
  /// `add_files` was given a name the module already owns.
  #[error("file '{file}' was already added to the module")]
  DuplicateFile { file: String },

  /// A per-file declaration named a file that was never added.
  #[error("file '{file}' was never added with add_files")]
  UnknownFile { file: String },

  /// The definition did not provide a required field.
  #[error("module definition is missing required field '{field}'")]
  MissingField { field: &'static str },

  /// Name and version were already supplied; a module's identity never changes.
  #[error("module '{name}' already has its name and version")]
  IdentityAlreadySet { name: String },

  /// The definition's version could not be interpreted.
  #[error("invalid module version '{value}': {reason}")]
  InvalidVersion { value: String, reason: String },

  /// A builder function was called outside definition or configure execution.
  #[error("module declarations are sealed: builder functions only work while a definition or its configure hook runs")]
  Sealed,
}

/// Per-source-file compile properties.
#[derive(Debug, Clone)]
pub struct CompileFile {
  source: PathBuf,
  compiler_flags: Vec<String>,
  include_dirs: Vec<PathBuf>,
  required_actions: Vec<ActionHandle>,
}

impl CompileFile {
  pub fn new(source: impl Into<PathBuf>) -> Self {
    Self {
      source: source.into(),
      compiler_flags: Vec::new(),
      include_dirs: Vec::new(),
      required_actions: Vec::new(),
    }
  }

  pub fn source(&self) -> &Path {
    &self.source
  }

  pub fn compiler_flags(&self) -> &[String] {
    &self.compiler_flags
  }

  pub fn include_dirs(&self) -> &[PathBuf] {
    &self.include_dirs
  }

  pub fn required_actions(&self) -> &[ActionHandle] {
    &self.required_actions
  }

  pub fn add_compiler_flags<I, S>(&mut self, flags: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.compiler_flags.extend(flags.into_iter().map(Into::into));
  }

  pub fn add_include_dirs<I, P>(&mut self, dirs: I)
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.include_dirs.extend(dirs.into_iter().map(Into::into));
  }

  pub fn add_required_action(&mut self, action: ActionHandle) {
    self.required_actions.push(action);
  }
}

/// Identity fields captured from a definition's result namespace.
#[derive(Debug, Clone, Default)]
pub(crate) struct Definition {
  pub name: Option<String>,
  pub version: Option<ModuleVersion>,
}

/// A named, versioned collection of compile declarations.
#[derive(Debug, Clone, Default)]
pub struct Module {
  name: String,
  version: ModuleVersion,
  source_dir: PathBuf,
  origin: Option<PathBuf>,
  files: BTreeMap<String, CompileFile>,
  compiler_flags: Vec<String>,
  include_dirs: Vec<PathBuf>,
  prebuild_steps: Vec<PrebuildStep>,
  configure: Option<ConfigureHook>,
  identified: bool,
}

impl Module {
  /// Create an unnamed module whose files resolve against `source_dir`.
  ///
  /// Name and version are filled in by [`Module::read_definition`] once the
  /// definition has run.
  pub fn new(source_dir: impl Into<PathBuf>) -> Self {
    Self {
      source_dir: source_dir.into(),
      ..Self::default()
    }
  }

  /// Create a module with a known identity, for modules declared from Rust.
  pub fn with_identity(name: impl Into<String>, version: ModuleVersion, source_dir: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      version,
      source_dir: source_dir.into(),
      identified: true,
      ..Self::default()
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &ModuleVersion {
    &self.version
  }

  pub fn source_dir(&self) -> &Path {
    &self.source_dir
  }

  /// Definition file this module was loaded from, if any.
  pub fn origin(&self) -> Option<&Path> {
    self.origin.as_deref()
  }

  pub fn files(&self) -> &BTreeMap<String, CompileFile> {
    &self.files
  }

  pub fn file(&self, name: &str) -> Option<&CompileFile> {
    self.files.get(name)
  }

  pub fn compiler_flags(&self) -> &[String] {
    &self.compiler_flags
  }

  pub fn include_dirs(&self) -> &[PathBuf] {
    &self.include_dirs
  }

  pub fn prebuild_steps(&self) -> &[PrebuildStep] {
    &self.prebuild_steps
  }

  pub fn configure_hook(&self) -> Option<&ConfigureHook> {
    self.configure.as_ref()
  }

  pub fn set_configure(&mut self, hook: ConfigureHook) {
    self.configure = Some(hook);
  }

  pub(crate) fn set_origin(&mut self, origin: impl Into<PathBuf>) {
    self.origin = Some(origin.into());
  }

  /// Take `name` and `version` from a definition's captured namespace.
  ///
  /// Succeeds at most once, and never for a module built with [`Module::with_identity`].
  pub(crate) fn read_definition(&mut self, definition: Definition) -> Result<(), ModuleError> {
    if self.identified {
      return Err(ModuleError::IdentityAlreadySet {
        name: self.name.clone(),
      });
    }
    let name = definition.name.ok_or(ModuleError::MissingField { field: "name" })?;
    let version = definition.version.ok_or(ModuleError::MissingField { field: "version" })?;
    self.name = name;
    self.version = version;
    self.identified = true;
    Ok(())
  }

  /// Add source files, each resolved against the module's source directory.
  ///
  /// Either every name is added or, when one is already present (or repeated
  /// within `names`), none are.
  pub fn add_files<I, S>(&mut self, names: I) -> Result<(), ModuleError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    for (i, name) in names.iter().enumerate() {
      if self.files.contains_key(name) || names[..i].contains(name) {
        return Err(ModuleError::DuplicateFile { file: name.clone() });
      }
    }

    for name in names {
      let file = CompileFile::new(self.source_dir.join(&name));
      self.files.insert(name, file);
    }
    Ok(())
  }

  pub fn add_compiler_flags<I, S>(&mut self, flags: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.compiler_flags.extend(flags.into_iter().map(Into::into));
  }

  pub fn add_include_dirs<I, P>(&mut self, dirs: I)
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.include_dirs.extend(dirs.into_iter().map(Into::into));
  }

  /// Register a module-scoped pre-build step.
  pub fn add_prebuild_step(&mut self, step: PrebuildStep) {
    self.prebuild_steps.push(step);
  }

  /// Register a module-scoped pre-action without output metadata.
  pub fn add_required_action(&mut self, action: ActionHandle) {
    self.add_prebuild_step(PrebuildStep::new(action));
  }

  pub fn add_file_compiler_flags<I, S>(&mut self, file: &str, flags: I) -> Result<(), ModuleError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.file_mut(file)?.add_compiler_flags(flags);
    Ok(())
  }

  pub fn add_file_include_dirs<I, P>(&mut self, file: &str, dirs: I) -> Result<(), ModuleError>
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.file_mut(file)?.add_include_dirs(dirs);
    Ok(())
  }

  pub fn add_file_required_action(&mut self, file: &str, action: ActionHandle) -> Result<(), ModuleError> {
    self.file_mut(file)?.add_required_action(action);
    Ok(())
  }

  /// Module-wide flags followed by the file's own flags.
  pub fn effective_compiler_flags(&self, file: &str) -> Result<Vec<&str>, ModuleError> {
    let compile_file = self.file_ref(file)?;
    Ok(
      self
        .compiler_flags
        .iter()
        .chain(compile_file.compiler_flags())
        .map(String::as_str)
        .collect(),
    )
  }

  /// Module-wide include directories followed by the file's own.
  pub fn effective_include_dirs(&self, file: &str) -> Result<Vec<&Path>, ModuleError> {
    let compile_file = self.file_ref(file)?;
    Ok(
      self
        .include_dirs
        .iter()
        .chain(compile_file.include_dirs())
        .map(PathBuf::as_path)
        .collect(),
    )
  }

  fn file_ref(&self, file: &str) -> Result<&CompileFile, ModuleError> {
    self.files.get(file).ok_or_else(|| ModuleError::UnknownFile { file: file.to_string() })
  }

  fn file_mut(&mut self, file: &str) -> Result<&mut CompileFile, ModuleError> {
    self
      .files
      .get_mut(file)
      .ok_or_else(|| ModuleError::UnknownFile { file: file.to_string() })
  }
}
