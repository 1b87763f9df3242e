//! accir.toml discovery and its effect on compilation

use std::fs;

use accir_core::config::CONFIG_FILE_NAME;
use accir_core::{Compiler, Config, Error};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) {
    fs::write(dir.path().join(CONFIG_FILE_NAME), content).unwrap();
}

#[test]
fn test_find_in_parent_directory() {
    let root = TempDir::new().unwrap();
    write_config(&root, "[module]\nname = \"project\"\n\n[run]\nstep_limit = 42\n");
    let nested = root.path().join("src").join("asm");
    fs::create_dir_all(&nested).unwrap();

    let (config, path) = Config::find_and_load(&nested).unwrap();
    assert_eq!(path, root.path().join(CONFIG_FILE_NAME));
    assert_eq!(config.module.module_name, "project");
    assert_eq!(config.module.function_name, "main");
    assert_eq!(config.run.step_limit, 42);
}

#[test]
fn test_nearest_config_wins() {
    let root = TempDir::new().unwrap();
    write_config(&root, "[module]\nname = \"outer\"\n");
    let inner = root.path().join("inner");
    fs::create_dir(&inner).unwrap();
    fs::write(inner.join(CONFIG_FILE_NAME), "[module]\nname = \"inner\"\n").unwrap();

    let (config, _) = Config::find_and_load(&inner).unwrap();
    assert_eq!(config.module.module_name, "inner");
}

#[test]
fn test_invalid_file_reports_config_error() {
    let root = TempDir::new().unwrap();
    write_config(&root, "[run]\nstep_limit = \"many\"\n");

    let err = Config::from_file(&root.path().join(CONFIG_FILE_NAME)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.code(), "E501");
}

#[test]
fn test_missing_file() {
    let root = TempDir::new().unwrap();
    let err = Config::from_file(&root.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.code(), "E502");
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_config_drives_compiler() {
    let root = TempDir::new().unwrap();
    write_config(&root, "[module]\nname = \"demo\"\nfunction = \"run\"\n");

    let (config, _) = Config::find_and_load(root.path()).unwrap();
    let compilation = Compiler::with_options(config.module).compile("STOP\n").unwrap();
    let ir = compilation.module.to_string();

    assert!(ir.starts_with("; ModuleID = 'demo'\n"));
    assert!(ir.contains("define i32 @run() {"));
}

#[test]
fn test_function_name_is_reserved() {
    let options = Config::from_str("[module]\nfunction = \"go\"\n").unwrap().module;
    let errors = Compiler::with_options(options).compile("go: STOP\n").unwrap_err();
    assert_eq!(errors.first().map(Error::code), Some("E304"));
}
