//! Opaque action handles used for pre-build steps and configure hooks.
//!
//! Definitions hand the builder callables (Lua functions) that run later, during
//! the Configuring and PreBuilding phases. The model stores them behind the
//! [`Action`] and [`Configure`] traits so it does not depend on where they came
//! from; Rust callers can register plain closures through [`ActionHandle::from_fn`].

use std::fmt;
use std::rc::Rc;

use crate::module::Module;

/// Whatever a step or hook reports when it fails.
///
/// Not `Send`: Lua errors and the actions that raise them stay on the thread
/// that owns the Lua state.
pub type StepError = Box<dyn std::error::Error>;

/// A side-effecting unit of work executed before compilation.
pub trait Action {
  fn run(&self) -> Result<(), StepError>;
}

/// A module's configure entry point.
///
/// The hook receives the module it belongs to so it can append declarations
/// while it runs, plus the options the build configuration selected for it.
pub trait Configure {
  fn configure(&self, module: &mut Module, options: &serde_json::Value) -> Result<(), StepError>;
}

struct FnAction<F>(F);

impl<F> Action for FnAction<F>
where
  F: Fn() -> Result<(), StepError>,
{
  fn run(&self) -> Result<(), StepError> {
    (self.0)()
  }
}

struct FnConfigure<F>(F);

impl<F> Configure for FnConfigure<F>
where
  F: Fn(&mut Module, &serde_json::Value) -> Result<(), StepError>,
{
  fn configure(&self, module: &mut Module, options: &serde_json::Value) -> Result<(), StepError> {
    (self.0)(module, options)
  }
}

/// Shared handle to an [`Action`].
#[derive(Clone)]
pub struct ActionHandle(Rc<dyn Action>);

impl ActionHandle {
  pub fn new(action: impl Action + 'static) -> Self {
    Self(Rc::new(action))
  }

  pub fn from_fn<F>(f: F) -> Self
  where
    F: Fn() -> Result<(), StepError> + 'static,
  {
    Self::new(FnAction(f))
  }

  pub fn run(&self) -> Result<(), StepError> {
    self.0.run()
  }
}

impl fmt::Debug for ActionHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ActionHandle(..)")
  }
}

/// Shared handle to a [`Configure`] hook.
#[derive(Clone)]
pub struct ConfigureHook(Rc<dyn Configure>);

impl ConfigureHook {
  pub fn new(hook: impl Configure + 'static) -> Self {
    Self(Rc::new(hook))
  }

  pub fn from_fn<F>(f: F) -> Self
  where
    F: Fn(&mut Module, &serde_json::Value) -> Result<(), StepError> + 'static,
  {
    Self::new(FnConfigure(f))
  }

  pub fn configure(&self, module: &mut Module, options: &serde_json::Value) -> Result<(), StepError> {
    self.0.configure(module, options)
  }
}

impl fmt::Debug for ConfigureHook {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ConfigureHook(..)")
  }
}

/// A pre-build step registered by a module.
///
/// `outputs` and `dependencies` are recorded for the compile driver but do not
/// reorder execution: steps run in the order they were registered.
#[derive(Debug, Clone)]
pub struct PrebuildStep {
  pub action: ActionHandle,
  pub outputs: Vec<String>,
  pub dependencies: Vec<String>,
}

impl PrebuildStep {
  pub fn new(action: ActionHandle) -> Self {
    Self {
      action,
      outputs: Vec::new(),
      dependencies: Vec::new(),
    }
  }
}
