use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_quarry"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "quarry init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".quarry.toml");
    assert!(config_path.exists(), ".quarry.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[database]"));
    assert!(content.contains("[tools]"));
    assert!(content.contains("[mining]"));

    // Verify it's valid TOML that quarry-core can parse
    let _config = quarry_core::QuarryConfig::from_toml(&content).unwrap();
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".quarry.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_quarry"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
}
