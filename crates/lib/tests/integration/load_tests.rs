//! Tests for loading modules across repositories.

use ctor_lib::eval::{LoadError, load_modules};
use ctor_lib::module::{ModuleError, ModuleVersion};

use super::common::{TestEnv, minimal_definition};

mod precedence {
  use super::*;

  fn two_repositories() -> TestEnv {
    let env = TestEnv::new();
    env.repository("a");
    env.definition("a", "core.ctor", &minimal_definition("core", "1"));
    env.repository("b");
    env.definition("b", "core.ctor", &minimal_definition("core", "2"));
    env
  }

  #[test]
  fn higher_version_wins_in_either_order() {
    let env = two_repositories();
    let a = env.path().join("a");
    let b = env.path().join("b");

    for dirs in [[&a, &b], [&b, &a]] {
      let registry = load_modules(&dirs).unwrap();
      assert_eq!(registry.len(), 1);
      let core = registry.lookup("core").unwrap();
      assert_eq!(core.version(), &ModuleVersion::from(2));
      assert_eq!(core.source_dir(), env.source_dir("b"));
    }
  }

  #[test]
  fn equal_versions_keep_the_first_repository() {
    let env = TestEnv::new();
    env.repository("a");
    env.definition("a", "core.ctor", &minimal_definition("core", "'1.0'"));
    env.repository("b");
    env.definition("b", "core.ctor", &minimal_definition("core", "1"));

    let registry = load_modules(&[env.path().join("b"), env.path().join("a")]).unwrap();
    assert_eq!(registry.lookup("core").unwrap().source_dir(), env.source_dir("b"));
  }

  #[test]
  fn distinct_names_all_register() {
    let env = two_repositories();
    env.definition("a", "audio.ctor", &minimal_definition("audio", "1"));

    let registry = load_modules(&[env.path().join("a"), env.path().join("b")]).unwrap();
    let names: Vec<&str> = registry.modules().iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["audio", "core"]);
  }
}

mod definitions {
  use super::*;

  #[test]
  fn declarations_resolve_against_repository_source_dir() {
    let env = TestEnv::new();
    let repo = env.repository("motor");
    env.definition(
      "motor",
      "core.ctor",
      r#"
        name = "core"
        version = "1.4"
        add_files("main.c", { "audio/mixer.c" })
        add_include_dirs("include")
        add_compiler_flags("-std=c11")
        add_file_flags("main.c", "-DMAIN")
        function configure(options) end
      "#,
    );

    let registry = load_modules(&[repo]).unwrap();
    let core = registry.lookup("core").unwrap();
    let source_dir = env.source_dir("motor");

    assert_eq!(core.file("audio/mixer.c").unwrap().source(), source_dir.join("audio/mixer.c"));
    assert_eq!(core.effective_compiler_flags("main.c").unwrap(), vec!["-std=c11", "-DMAIN"]);
    assert_eq!(core.effective_compiler_flags("audio/mixer.c").unwrap(), vec!["-std=c11"]);
    assert!(core.origin().unwrap().ends_with("modules/core.ctor"));
  }

  #[test]
  fn missing_version_registers_nothing() {
    let env = TestEnv::new();
    let repo = env.repository("motor");
    env.definition("motor", "audio.ctor", &minimal_definition("audio", "1"));
    env.definition("motor", "core.ctor", "name = 'core'\nfunction configure() end\n");

    let err = load_modules(&[repo]).unwrap_err();
    match err {
      LoadError::InvalidModuleDefinition { path, reason } => {
        assert!(path.ends_with("modules/core.ctor"));
        assert!(reason.contains("version"), "unexpected reason: {}", reason);
      }
      other => panic!("expected InvalidModuleDefinition, got {:?}", other),
    }
  }

  #[test]
  fn duplicate_file_is_a_declaration_error() {
    let env = TestEnv::new();
    let repo = env.repository("motor");
    env.definition(
      "motor",
      "core.ctor",
      "name = 'core'\nversion = 1\nadd_files('a.c')\nadd_files('a.c')\nfunction configure() end\n",
    );

    let err = load_modules(&[repo]).unwrap_err();
    match err {
      LoadError::Declaration { source, .. } => {
        assert_eq!(source, ModuleError::DuplicateFile { file: "a.c".to_string() });
      }
      other => panic!("expected Declaration, got {:?}", other),
    }
  }

  #[test]
  fn sandbox_hides_host_access() {
    let env = TestEnv::new();
    let repo = env.repository("motor");
    env.definition(
      "motor",
      "core.ctor",
      "name = 'core'\nversion = 1\nlocal f = io.open('/etc/passwd')\nfunction configure() end\n",
    );

    assert!(matches!(load_modules(&[repo]), Err(LoadError::Script { .. })));
  }

  #[test]
  fn definitions_do_not_share_globals() {
    let env = TestEnv::new();
    let repo = env.repository("motor");
    env.definition(
      "motor",
      "a.ctor",
      "name = 'a'\nversion = 1\nshared_flag = '-DFROM_A'\nfunction configure() end\n",
    );
    env.definition(
      "motor",
      "b.ctor",
      r#"
        name = "b"
        version = 1
        add_files("b.c")
        if shared_flag then add_compiler_flags(shared_flag) end
        function configure() end
      "#,
    );

    let registry = load_modules(&[repo]).unwrap();
    assert!(registry.lookup("b").unwrap().compiler_flags().is_empty());
  }

  #[test]
  fn repository_without_descriptor_fails() {
    let env = TestEnv::new();
    env.definition("bare", "core.ctor", &minimal_definition("core", "1"));

    assert!(matches!(
      load_modules(&[env.path().join("bare")]),
      Err(LoadError::RepositoryDescriptor { .. })
    ));
  }
}
