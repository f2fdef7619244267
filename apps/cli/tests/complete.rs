use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

fn cli() -> Result<Command, Box<dyn Error>> {
    Ok(Command::cargo_bin("odinsense")?)
}

fn write(root: &Path, relative: &str, text: &str) -> Result<(), Box<dyn Error>> {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, text)?;
    Ok(())
}

/// Odin install with a tiny `core:fmt`, plus a settings file pointing at it.
fn workspace() -> Result<TempDir, Box<dyn Error>> {
    let dir = tempdir()?;
    write(
        dir.path(),
        "odin/core/fmt/print.odin",
        "package fmt\n\nprintln :: proc(args: ..any) {}\nprintf :: proc(format: string, args: ..any) {}\n",
    )?;
    write(dir.path(), "odin/core/math/linalg/linalg.odin", "package linalg\n")?;
    write(
        dir.path(),
        "settings.json",
        &format!(
            r#"{{ "odin_install_path": "{}" }}"#,
            dir.path().join("odin").display()
        ),
    )?;
    write(
        dir.path(),
        "app/main.odin",
        "package main\n\nimport \"core:fmt\"\n\nmain :: proc() {\n\tfmt.\n\tlinalg.\n}\n",
    )?;
    Ok(dir)
}

fn settings_arg(dir: &TempDir) -> String {
    dir.path().join("settings.json").display().to_string()
}

#[test]
fn complete_lists_package_procedures() -> Result<(), Box<dyn Error>> {
    let dir = workspace()?;
    let main = dir.path().join("app/main.odin");

    cli()?
        .args([
            "--settings",
            &settings_arg(&dir),
            "complete",
            main.to_str().unwrap(),
            "--line",
            "6",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "println(args: ..any)\tfmt\tprintln(${1:args: ..any})",
        ))
        .stdout(predicate::str::contains("printf(format: string, args: ..any)\tfmt"));

    Ok(())
}

#[test]
fn complete_emits_json() -> Result<(), Box<dyn Error>> {
    let dir = workspace()?;
    let main = dir.path().join("app/main.odin");

    let output = cli()?
        .args([
            "--settings",
            &settings_arg(&dir),
            "complete",
            main.to_str().unwrap(),
            "--line",
            "6",
            "--json",
        ])
        .output()?;
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["kind"], "procedure");
    assert_eq!(entries[0]["insert_text"], "println(${1:args: ..any})");
    Ok(())
}

#[test]
fn complete_inside_comment_prints_nothing() -> Result<(), Box<dyn Error>> {
    let dir = workspace()?;
    let main = dir.path().join("app/main.odin");

    cli()?
        .args([
            "--settings",
            &settings_arg(&dir),
            "complete",
            main.to_str().unwrap(),
            "--line",
            "6",
            "--in-comment",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn complete_applies_import_quick_fix() -> Result<(), Box<dyn Error>> {
    let dir = workspace()?;
    let main = dir.path().join("app/main.odin");

    cli()?
        .args([
            "--settings",
            &settings_arg(&dir),
            "complete",
            main.to_str().unwrap(),
            "--line",
            "7",
            "--apply-fix",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Added import \"core:math/linalg\""));

    let updated = fs::read_to_string(&main)?;
    assert!(updated.contains("import \"core:fmt\"\nimport \"core:math/linalg\"\n"));
    Ok(())
}

#[test]
fn complete_rejects_line_outside_file() -> Result<(), Box<dyn Error>> {
    let dir = workspace()?;
    let main = dir.path().join("app/main.odin");

    cli()?
        .args([
            "--settings",
            &settings_arg(&dir),
            "complete",
            main.to_str().unwrap(),
            "--line",
            "99",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 99 is outside"));
    Ok(())
}

#[test]
fn complete_accepts_empty_line_after_trailing_newline() -> Result<(), Box<dyn Error>> {
    let dir = workspace()?;
    write(dir.path(), "app/main.odin", "package main\n\nimport \"core:fmt\"\n")?;
    let main = dir.path().join("app/main.odin");

    cli()?
        .args([
            "--settings",
            &settings_arg(&dir),
            "complete",
            main.to_str().unwrap(),
            "--line",
            "4",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("fmt\tpackage fmt\tfmt"));

    cli()?
        .args([
            "--settings",
            &settings_arg(&dir),
            "complete",
            main.to_str().unwrap(),
            "--line",
            "5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 5 is outside"));
    Ok(())
}

#[test]
fn ranked_naked_completion_filters_by_prefix() -> Result<(), Box<dyn Error>> {
    let dir = workspace()?;
    write(
        dir.path(),
        "app/util.odin",
        "package main\n\nhelper :: proc() {}\nMAX_HEALTH :: 100\n",
    )?;
    write(
        dir.path(),
        "app/main.odin",
        "package main\n\nmain :: proc() {\n\thel\n}\n",
    )?;
    let main = dir.path().join("app/main.odin");

    cli()?
        .args([
            "--settings",
            &settings_arg(&dir),
            "complete",
            main.to_str().unwrap(),
            "--line",
            "4",
            "--rank",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("helper()\tutil.odin\thelper()"))
        .stdout(predicate::str::contains("main()").not());
    Ok(())
}
