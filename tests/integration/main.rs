//! Integration tests for bundlecost

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn bundlecost() -> Command {
        let mut cmd = cargo_bin_cmd!("bundlecost");
        cmd.env_remove("BUNDLECOST_CONFIG").env_remove("RUST_LOG");
        cmd
    }

    /// Config file whose workspace root lives inside `dir`
    fn write_config(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("config.toml");
        let root = dir.path().join("root");
        std::fs::write(
            &path,
            format!("[workspace]\nroot = {:?}\n", root.display().to_string()),
        )
        .unwrap();
        path
    }

    fn config_arg(path: &Path) -> String {
        path.display().to_string()
    }

    #[test]
    fn help_displays() {
        bundlecost()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("what an npm dependency costs"));
    }

    #[test]
    fn version_displays() {
        bundlecost()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("bundlecost"));
    }

    #[test]
    fn measure_help_lists_release_flag() {
        bundlecost()
            .args(["measure", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--release"));
    }

    #[test]
    fn config_path_honors_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        bundlecost()
            .args(["-c", &config_arg(&path), "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        bundlecost()
            .args(["-c", &config_arg(&path), "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[pipeline]"))
            .stdout(predicate::str::contains("max_attempts = 5"));
    }

    #[test]
    fn config_init_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        bundlecost()
            .args(["-c", &config_arg(&path), "config", "init"])
            .assert()
            .success();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[bundler]"));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        bundlecost()
            .args(["-c", &config_arg(&path), "config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn broken_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pipeline]\nmax_attempts = 0\n").unwrap();
        bundlecost()
            .args(["-c", &config_arg(&path), "clean"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn invalid_package_name_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        bundlecost()
            .args([
                "-c",
                &config_arg(&path),
                "measure",
                "../etc/passwd",
                "--format",
                "json",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid package name"));
    }

    #[test]
    fn clean_on_empty_root() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        bundlecost()
            .args(["-c", &config_arg(&path), "clean"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No leftover workspaces"));
    }
}
