use artifact_forge::config::Config;
use std::io::Write;
use tempfile::NamedTempFile;

fn load(content: &str) -> artifact_forge::Result<Config> {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    Config::load(Some(file.path()))
}

#[test]
fn parse_complete_config_file() {
    let config = load(
        r#"
[workspace]
scratch_root = "/var/tmp/forge"
cleanup_delay_secs = 30
max_file_size = 1048576
max_files = 20

[toolchain]
compile_timeout_secs = 45
archive_timeout_secs = 15
go_timeout_secs = 90
multi_stage_timeout_secs = 300

[build]
default_project_name = "generated"
parallel_jobs = 2
"#,
    )
    .unwrap();

    assert_eq!(config.workspace.scratch_root.to_str(), Some("/var/tmp/forge"));
    assert_eq!(config.workspace.cleanup_delay_secs, 30);
    assert_eq!(config.workspace.max_files, 20);
    assert_eq!(config.toolchain.go_timeout_secs, 90);
    assert_eq!(config.toolchain.multi_stage_timeout().as_secs(), 300);
    assert_eq!(config.build.default_project_name, "generated");
    assert_eq!(config.build.parallel_jobs, 2);
}

#[test]
fn parse_partial_config_uses_defaults() {
    let config = load("[toolchain]\ncompile_timeout_secs = 10\n").unwrap();

    // Explicit value
    assert_eq!(config.toolchain.compile_timeout_secs, 10);
    // Default values
    assert_eq!(config.toolchain.multi_stage_timeout_secs, 180);
    assert_eq!(config.workspace.cleanup_delay_secs, 60);
    assert_eq!(config.build.default_project_name, "compiled-project");
}

#[test]
fn parse_invalid_toml_returns_error() {
    let result = load("this is not valid toml [[[");
    assert!(result.is_err());
}

#[test]
fn zero_timeout_returns_error() {
    let err = load("[toolchain]\ngo_timeout_secs = 0\n").unwrap_err();
    assert!(err.to_string().contains("go_timeout_secs"));
}

#[test]
fn excessive_timeout_returns_error() {
    let err = load("[toolchain]\ncompile_timeout_secs = 7200\n").unwrap_err();
    assert_eq!(err.kind(), "config");
}

#[test]
fn invalid_default_project_name_returns_error() {
    let err = load("[build]\ndefault_project_name = \"../escape\"\n").unwrap_err();
    assert!(err.to_string().contains("default_project_name"));
}

#[test]
fn missing_explicit_file_returns_error() {
    let result = Config::load(Some(std::path::Path::new("/nonexistent/forge.toml")));
    assert!(result.is_err());
}
