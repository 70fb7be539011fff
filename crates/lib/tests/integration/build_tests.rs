//! Tests for the full build: loading, configuring and pre-building.

use std::cell::RefCell;
use std::rc::Rc;

use ctor_lib::action::ActionHandle;
use ctor_lib::build::{BuildError, BuildPhase, build, build_from_file, run};
use ctor_lib::config::{BuildConfig, ModuleOptions};
use ctor_lib::consts::MODULE_PATH_ENV;
use ctor_lib::eval::load_modules;
use ctor_lib::module::ModuleError;
use ctor_lib::registry::RegistryError;
use serial_test::serial;

use super::common::{TestEnv, minimal_definition};

const CORE_WITH_OPTIONS: &str = r#"
  name = "core"
  version = 2
  add_files("main.c", "motor.c")
  add_compiler_flags("-std=c11")

  function configure(options)
    if options.debug then
      add_compiler_flags("-g", "-O0")
      add_file_flags("main.c", "-DDEBUG_MAIN")
    end
  end
"#;

fn selection(names: &[&str]) -> ModuleOptions {
  names
    .iter()
    .map(|name| (name.to_string(), serde_json::json!({})))
    .collect()
}

#[test]
#[serial]
fn build_from_file_configures_the_winning_version() {
  let env = TestEnv::new();
  env.repository("a");
  env.definition("a", "core.ctor", &minimal_definition("core", "1"));
  env.repository("b");
  env.definition("b", "core.ctor", CORE_WITH_OPTIONS);
  let config = env.build_config(r#"{ "module_dirs": ["a", "b"], "modules": { "core": { "debug": true } } }"#);

  let report = temp_env::with_var_unset(MODULE_PATH_ENV, || build_from_file(&config)).unwrap();

  assert_eq!(report.configured, vec!["core"]);
  assert_eq!(report.steps_run, 0);
  let core = report.manifest.module("core").unwrap();
  assert_eq!(core.version.to_string(), "2");
  assert_eq!(
    core.files["main.c"].compiler_flags,
    vec!["-std=c11", "-g", "-O0", "-DDEBUG_MAIN"]
  );
  assert_eq!(core.files["motor.c"].compiler_flags, vec!["-std=c11", "-g", "-O0"]);
}

#[test]
fn options_select_configure_behavior() {
  let env = TestEnv::new();
  let repo = env.repository("motor");
  env.definition("motor", "core.ctor", CORE_WITH_OPTIONS);

  let mut registry = load_modules(&[repo]).unwrap();
  let report = run(&mut registry, &selection(&["core"])).unwrap();

  let core = report.manifest.module("core").unwrap();
  assert_eq!(core.files["main.c"].compiler_flags, vec!["-std=c11"]);
}

#[test]
fn unknown_module_stops_before_any_step() {
  let env = TestEnv::new();
  let repo = env.repository("motor");
  env.definition(
    "motor",
    "core.ctor",
    r#"
      name = "core"
      version = 1
      add_prebuild_step(function() error("pre-build step must not run") end)
      function configure(options) end
    "#,
  );

  let mut registry = load_modules(&[repo]).unwrap();
  let err = run(&mut registry, &selection(&["core", "physics"])).unwrap_err();

  assert!(matches!(
    err,
    BuildError::Registry(RegistryError::ModuleNotFound { ref name }) if name == "physics"
  ));
  assert_eq!(err.phase(), BuildPhase::Configuring);
}

#[test]
fn failing_step_stops_later_steps() {
  let env = TestEnv::new();
  let repo = env.repository("motor");
  env.definition(
    "motor",
    "core.ctor",
    r#"
      name = "core"
      version = 1
      add_prebuild_step(function() end, { "gen/a.h" })
      add_prebuild_step(function() error("code generator crashed") end, { "gen/b.h" }, { "gen/a.h" })
      add_prebuild_step(function() error("third step ran") end)
      function configure(options) end
    "#,
  );

  let mut registry = load_modules(&[repo]).unwrap();
  let later = Rc::new(RefCell::new(false));
  let flag = later.clone();
  registry
    .lookup_mut("core")
    .unwrap()
    .add_required_action(ActionHandle::from_fn(move || {
      *flag.borrow_mut() = true;
      Ok(())
    }));

  let err = run(&mut registry, &ModuleOptions::new()).unwrap_err();
  match &err {
    BuildError::PreBuildStep { module, index, source } => {
      assert_eq!(module, "core");
      assert_eq!(*index, 1);
      assert!(source.to_string().contains("code generator crashed"), "{}", source);
    }
    other => panic!("expected PreBuildStep, got {:?}", other),
  }
  assert!(!*later.borrow());
}

#[test]
fn empty_selection_runs_steps_of_every_module() {
  let env = TestEnv::new();
  let repo = env.repository("motor");
  env.definition(
    "motor",
    "audio.ctor",
    "name = 'audio'\nversion = 1\nadd_prebuild_step(function() end)\nfunction configure() end\n",
  );
  env.definition(
    "motor",
    "core.ctor",
    "name = 'core'\nversion = 1\nadd_prebuild_step(function() end)\nadd_prebuild_step(function() end)\nfunction configure() end\n",
  );

  let mut registry = load_modules(&[repo]).unwrap();
  let report = run(&mut registry, &ModuleOptions::new()).unwrap();

  assert!(report.configured.is_empty());
  assert_eq!(report.steps_run, 3);
}

#[test]
fn configure_declaration_errors_are_typed() {
  let env = TestEnv::new();
  let repo = env.repository("motor");
  env.definition(
    "motor",
    "core.ctor",
    r#"
      name = "core"
      version = 1
      function configure(options)
        add_file_flags("missing.c", "-DX")
      end
    "#,
  );

  let mut registry = load_modules(&[repo]).unwrap();
  let err = run(&mut registry, &selection(&["core"])).unwrap_err();

  match err {
    BuildError::Configure { module, source } => {
      assert_eq!(module, "core");
      assert_eq!(
        source.downcast_ref::<ModuleError>(),
        Some(&ModuleError::UnknownFile {
          file: "missing.c".to_string()
        })
      );
    }
    other => panic!("expected Configure, got {:?}", other),
  }
}

#[test]
fn builders_are_sealed_inside_prebuild_steps() {
  let env = TestEnv::new();
  let repo = env.repository("motor");
  env.definition(
    "motor",
    "core.ctor",
    "name = 'core'\nversion = 1\nadd_prebuild_step(function() add_compiler_flags('-late') end)\nfunction configure() end\n",
  );

  let mut registry = load_modules(&[repo]).unwrap();
  let err = run(&mut registry, &ModuleOptions::new()).unwrap_err();

  match err {
    BuildError::PreBuildStep { source, .. } => {
      assert_eq!(source.downcast_ref::<ModuleError>(), Some(&ModuleError::Sealed));
    }
    other => panic!("expected PreBuildStep, got {:?}", other),
  }
  assert!(registry.lookup("core").unwrap().compiler_flags().is_empty());
}

#[test]
#[serial]
fn module_path_env_adds_repositories() {
  let env = TestEnv::new();
  let extra = env.repository("extra");
  env.definition("extra", "audio.ctor", &minimal_definition("audio", "3"));

  let config = BuildConfig {
    modules: selection(&["audio"]),
    ..BuildConfig::default()
  };
  let report = temp_env::with_var(MODULE_PATH_ENV, Some(extra.as_os_str()), || build(&config)).unwrap();

  assert_eq!(report.configured, vec!["audio"]);
  assert_eq!(report.manifest.module("audio").unwrap().version.to_string(), "3");
}

#[test]
#[serial]
fn load_failures_report_the_loading_phase() {
  let env = TestEnv::new();
  env.repository("motor");
  env.definition("motor", "core.ctor", "name = 'core'\nfunction configure() end\n");
  let config = env.build_config(r#"{ "module_dirs": ["motor"] }"#);

  let err = temp_env::with_var_unset(MODULE_PATH_ENV, || build_from_file(&config)).unwrap_err();
  assert!(matches!(err, BuildError::Load(_)));
  assert_eq!(err.phase(), BuildPhase::Loading);
}

#[test]
#[serial]
fn null_options_configure_with_defaults() {
  let env = TestEnv::new();
  env.repository("motor");
  env.definition("motor", "core.ctor", CORE_WITH_OPTIONS);
  let config = env.build_config(r#"{ "module_dirs": ["motor"], "modules": { "core": null } }"#);

  let report = temp_env::with_var_unset(MODULE_PATH_ENV, || build_from_file(&config)).unwrap();

  assert_eq!(report.configured, vec!["core"]);
  let core = report.manifest.module("core").unwrap();
  assert_eq!(core.files["main.c"].compiler_flags, vec!["-std=c11"]);
}

#[test]
fn file_required_actions_run_during_prebuild() {
  let env = TestEnv::new();
  let repo = env.repository("motor");
  env.definition(
    "motor",
    "core.ctor",
    r#"
      name = "core"
      version = 1
      add_files("parser.c")
      add_prebuild_step(function() end, { "gen/grammar.y" })
      function configure(options) end
    "#,
  );

  let mut registry = load_modules(&[repo]).unwrap();
  let ran = Rc::new(RefCell::new(0));
  let counter = ran.clone();
  registry
    .lookup_mut("core")
    .unwrap()
    .add_file_required_action(
      "parser.c",
      ActionHandle::from_fn(move || {
        *counter.borrow_mut() += 1;
        Ok(())
      }),
    )
    .unwrap();

  let report = run(&mut registry, &ModuleOptions::new()).unwrap();

  assert_eq!(report.steps_run, 1);
  assert_eq!(report.actions_run, 1);
  assert_eq!(*ran.borrow(), 1);
  assert_eq!(report.manifest.module("core").unwrap().files["parser.c"].required_actions, 1);
}
