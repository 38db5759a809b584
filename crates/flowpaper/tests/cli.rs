use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

fn flowpaper(config_dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flowpaper"))
        .env("FLOWPAPER_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run flowpaper")
}

#[test]
fn config_where_reports_env_override() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");

    let output = flowpaper(&config_dir, &["config", "where"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&config_dir.display().to_string()));
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_print_emits_parseable_defaults() {
    let root = TempDir::new().unwrap();

    let output = flowpaper(root.path(), &["config", "print"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let parsed = flowconfig::FlowConfig::from_toml_str(&stdout).expect("printed config parses");
    assert_eq!(parsed, flowconfig::FlowConfig::default());
}

#[test]
fn config_print_applies_file_and_flags() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("config.toml"),
        "[window]\nsize = [800, 600]\n",
    )
    .unwrap();

    let output = flowpaper(root.path(), &["--scene", "breathing", "config", "print"]);

    assert!(output.status.success());
    let parsed =
        flowconfig::FlowConfig::from_toml_str(&String::from_utf8(output.stdout).unwrap()).unwrap();
    assert_eq!(parsed.scene, flowconfig::SceneKind::Breathing);
    assert_eq!(parsed.window.size, (800, 600));
}

#[test]
fn invalid_config_file_fails() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("config.toml"), "version = 7\n").unwrap();

    let output = flowpaper(root.path(), &["config", "print"]);

    assert!(!output.status.success());
}

#[test]
fn still_export_writes_png_of_requested_size() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("frames").join("still.png");
    let target_arg = target.display().to_string();

    let output = flowpaper(
        root.path(),
        &[
            "--size",
            "64x48",
            "--still-export",
            &target_arg,
            "--still-time",
            "1.5",
        ],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let image = image::open(&target).expect("png readable").to_rgba8();
    assert_eq!(image.dimensions(), (64, 48));
}

#[test]
fn breathing_still_export_uses_scene_flag() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("breathing.png");
    let target_arg = target.display().to_string();

    let output = flowpaper(
        root.path(),
        &[
            "--scene",
            "breathing",
            "--size",
            "32x32",
            "--still-export",
            &target_arg,
            "--still-time",
            "5",
        ],
    );

    assert!(output.status.success());
    let image = image::open(&target).expect("png readable").to_rgba8();
    assert_eq!(image.dimensions(), (32, 32));
    assert!(image.pixels().all(|pixel| pixel[3] == 255));
}
