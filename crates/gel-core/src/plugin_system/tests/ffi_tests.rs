#![cfg(test)]

//! Tests against real modules: the `hello` example plugin and the
//! `bad_plugins` fixture under `tests/test_plugins/`, both compiled on demand.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use tempfile::{tempdir, TempDir};

use crate::plugin_system::engine::EngineConfig;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::{
    check_declared_name, module_file_name, open_module, read_plugin_dir, scan, CORE_VERSION, PLUGIN_ABI_VERSION,
};
use crate::plugin_system::tests::support::{loaded_names, Harness};
use crate::plugin_system::PluginDescriptor;

/// Shared by every test run so repeated runs build incrementally
fn target_dir() -> PathBuf {
    std::env::temp_dir().join("gel-core-test-plugins")
}

fn cargo() -> Command {
    Command::new(std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into()))
}

/// Runs `command` (a `cargo build`) and returns the module built for `lib_name`
fn compile(mut command: Command, lib_name: &str) -> Result<PathBuf, String> {
    let output = command
        .arg("--target-dir")
        .arg(target_dir())
        .output()
        .map_err(|e| format!("Failed to execute cargo build for {}: {}", lib_name, e))?;
    if !output.status.success() {
        return Err(format!(
            "Failed to compile {}: cargo build exited with {}.\nStderr:\n{}",
            lib_name,
            output.status,
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let module = target_dir().join("debug").join(module_file_name(lib_name));
    if module.is_file() {
        Ok(module)
    } else {
        Err(format!("Compiled module not found at {}", module.display()))
    }
}

fn built(result: &'static Result<PathBuf, String>) -> &'static Path {
    match result {
        Ok(path) => path,
        Err(e) => panic!("{e}"),
    }
}

/// The `hello` example plugin, built from this workspace
fn hello_module() -> &'static Path {
    static HELLO: OnceLock<Result<PathBuf, String>> = OnceLock::new();
    built(HELLO.get_or_init(|| {
        let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let mut command = cargo();
        command.current_dir(workspace).args(["build", "-p", "hello"]);
        compile(command, "hello")
    }))
}

/// A module exporting declarations the loader must refuse
fn bad_plugins_module() -> &'static Path {
    static BAD: OnceLock<Result<PathBuf, String>> = OnceLock::new();
    built(BAD.get_or_init(|| {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/test_plugins/bad_plugins/Cargo.toml");
        let mut command = cargo();
        command.arg("build").arg("--manifest-path").arg(manifest);
        compile(command, "bad_plugins")
    }))
}

/// Copies `module` into `<root>/<name>/` under the file name a scan expects
fn install(root: &Path, name: &str, module: &Path) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let installed = dir.join(module_file_name(name));
    fs::copy(module, &installed).unwrap();
    installed
}

fn search_path_with_hello() -> (TempDir, PathBuf) {
    let root = tempdir().expect("Failed to create temp directory");
    let module = install(root.path(), "hello", hello_module());
    (root, module)
}

#[test]
fn test_open_hello_module() {
    let (library, declaration) = open_module("hello", hello_module()).expect("open hello");
    assert_eq!(declaration.abi_version, PLUGIN_ABI_VERSION);
    assert_eq!(declaration.core_version, CORE_VERSION);

    let descriptor = (declaration.descriptor)();
    assert_eq!(descriptor.name(), "hello");
    assert_eq!(descriptor.dependencies(), ["settings"]);
    drop(descriptor);
    drop(library);
}

#[tokio::test]
async fn test_scan_reads_descriptor_embedded_in_module() {
    let (root, module) = search_path_with_hello();

    let found = scan(&[root.path().to_path_buf()]).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "hello");
    assert_eq!(found[0].version(), "0.1.0");
    assert_eq!(found[0].dependencies(), ["settings"]);
    assert_eq!(found[0].pathname(), Some(module.as_path()));
}

#[test]
fn test_load_and_unload_hello_module() {
    let (root, module) = search_path_with_hello();
    let mut harness = Harness::with_config(EngineConfig {
        search_paths: vec![root.path().to_path_buf()],
        ..EngineConfig::default()
    });
    harness.add("settings", "");

    let instance = harness.engine.load_path(&module).expect("load hello");
    assert!(instance.is_dynamic());
    assert_eq!(loaded_names(&harness.engine), vec!["settings", "hello"]);
    assert_eq!(harness.constructed(), 1, "only the builtin goes through a factory");

    harness.engine.unload("hello").expect("unload hello");
    assert!(!harness.engine.is_loaded("hello"));
    assert!(harness.engine.is_loaded("settings"));

    // The module can be opened again after its library was closed
    harness.engine.load("hello").expect("reload hello");
    assert!(harness.engine.is_loaded("hello"));
}

#[test]
fn test_missing_declaration_symbol() {
    match open_module("absent", bad_plugins_module()) {
        Err(PluginSystemError::SymbolNotFound { name, symbol, .. }) => {
            assert_eq!(name, "absent");
            assert_eq!(symbol, "absent_plugin");
        }
        Err(other) => panic!("expected SymbolNotFound, got {other}"),
        Ok(_) => panic!("expected SymbolNotFound"),
    }
}

#[test]
fn test_foreign_abi_version_is_refused() {
    match open_module("wrong_abi", bad_plugins_module()) {
        Err(PluginSystemError::AbiMismatch { expected, found, .. }) => {
            assert_eq!(expected, PLUGIN_ABI_VERSION.to_string());
            assert_eq!(found, "999");
        }
        Err(other) => panic!("expected AbiMismatch, got {other}"),
        Ok(_) => panic!("expected AbiMismatch"),
    }
}

#[test]
fn test_module_built_against_another_core_is_refused() {
    match open_module("stale_core", bad_plugins_module()) {
        Err(PluginSystemError::AbiMismatch { expected, found, .. }) => {
            assert!(expected.contains(CORE_VERSION), "{expected}");
            assert!(found.contains("0.0.0-stale"), "{found}");
        }
        Err(other) => panic!("expected AbiMismatch, got {other}"),
        Ok(_) => panic!("expected AbiMismatch"),
    }
}

#[tokio::test]
async fn test_scan_skips_refused_modules() {
    let (root, _) = search_path_with_hello();
    let stale = install(root.path(), "stale_core", bad_plugins_module());
    install(root.path(), "absent", bad_plugins_module());

    assert!(matches!(
        read_plugin_dir(stale.parent().unwrap()),
        Err(PluginSystemError::AbiMismatch { .. })
    ));

    let found = scan(&[root.path().to_path_buf()]).await;
    let names: Vec<&str> = found.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["hello"]);
}

#[tokio::test]
async fn test_module_under_another_name_is_not_found() {
    let root = tempdir().expect("Failed to create temp directory");
    let renamed = install(root.path(), "greeter", hello_module());

    assert!(matches!(
        read_plugin_dir(renamed.parent().unwrap()),
        Err(PluginSystemError::SymbolNotFound { .. })
    ));
    assert!(scan(&[root.path().to_path_buf()]).await.is_empty());
}

#[test]
fn test_check_declared_name() {
    let descriptor = PluginDescriptor::new("hello", "0.1.0");
    assert!(check_declared_name("hello", &descriptor).is_ok());

    match check_declared_name("greeter", &descriptor) {
        Err(PluginSystemError::InfoNotFound { name, reason }) => {
            assert_eq!(name, "greeter");
            assert!(reason.contains("'hello'"), "{reason}");
        }
        other => panic!("expected InfoNotFound, got {other:?}"),
    }
}
