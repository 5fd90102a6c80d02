use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_proposal-pdf"))
}

fn write_json(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, json).expect("Failed to write input file");
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_pdf(path: &Path) {
    assert!(path.exists(), "PDF file was not created: {}", path.display());
    let bytes = fs::read(path).expect("Failed to read PDF");
    assert!(bytes.starts_with(b"%PDF"), "Output is not a PDF");
    assert!(bytes.len() > 1000, "PDF file is too small, likely empty or corrupt");
}

const NATURE_WORKSHOP: &str = r#"{
    "name": "Nature Workshop",
    "capacity": { "headcount": "25", "duration": "4 sessions of 90 min" }
}"#;

#[test]
fn test_export_from_input_file() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "nature.json", NATURE_WORKSHOP);

    let output = cargo_bin()
        .args(["export", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(dir.path())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&dir.path().join("Proposal_LaMaxima_Nature Workshop_2026.pdf"));
    let out = stdout(&output);
    assert!(out.contains("✓ Generated"));
    assert!(out.contains("Pages: 1"));
}

#[test]
fn test_export_to_explicit_file() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "empty.json", "{}");
    let target = dir.path().join("custom.pdf");

    let output = cargo_bin()
        .args(["export", "--input"])
        .arg(&input)
        .arg("-o")
        .arg(&target)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&target);
    assert!(stdout(&output).contains("(unnamed)"));
}

#[test]
fn test_long_proposal_spans_pages() {
    let dir = TempDir::new().unwrap();
    let paragraph = "The group walks the garden and records what it finds. ".repeat(40);
    let json = format!(
        r#"{{"name":"Long","rationale":"{p}","objectives":"{p}","resources":"{p}","finalNotes":"{p}"}}"#,
        p = paragraph
    );
    let input = write_json(dir.path(), "long.json", &json);

    let output = cargo_bin()
        .args(["export", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(dir.path())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&dir.path().join("Proposal_LaMaxima_Long_2026.pdf"));
    let pages: usize = stdout(&output)
        .lines()
        .find_map(|l| l.trim().strip_prefix("Pages: ").map(|n| n.parse().unwrap()))
        .expect("page count missing");
    assert!(pages >= 2, "expected several pages, got {}", pages);
}

#[test]
fn test_config_changes_branding_and_year() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("proposal.toml");
    fs::write(
        &config,
        "[proposal]\ndefault_year = \"2030\"\norg_tag = \"Hub\"\n",
    )
    .unwrap();
    let input = write_json(dir.path(), "clay.json", r#"{"name":"Clay"}"#);

    let output = cargo_bin()
        .arg("--config")
        .arg(&config)
        .args(["export", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(dir.path())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&dir.path().join("Proposal_Hub_Clay_2030.pdf"));
}

#[test]
fn test_save_list_show_delete() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");
    let input = write_json(dir.path(), "nature.json", NATURE_WORKSHOP);

    let saved = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["save", "--input"])
        .arg(&input)
        .output()
        .expect("Failed to execute command");
    assert!(saved.status.success(), "Save failed: {:?}", saved);
    let id = stdout(&saved)
        .trim()
        .strip_prefix("✓ Created: ")
        .expect("missing id")
        .to_string();

    let listed = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["list", "--search", "nature"])
        .output()
        .expect("Failed to execute command");
    assert!(listed.status.success());
    let out = stdout(&listed);
    assert!(out.contains(&id));
    assert!(out.contains("Nature Workshop"));
    assert!(out.contains("Headcount: 25"));

    let shown = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["show", &id])
        .output()
        .expect("Failed to execute command");
    assert!(shown.status.success());
    let json: serde_json::Value = serde_json::from_slice(&shown.stdout).unwrap();
    assert_eq!(json["name"], "Nature Workshop");
    assert_eq!(json["id"], id.as_str());

    let exported = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["export", "--id", &id, "--output"])
        .arg(dir.path())
        .output()
        .expect("Failed to execute command");
    assert!(exported.status.success(), "Export failed: {:?}", exported);
    assert_pdf(&dir.path().join("Proposal_LaMaxima_Nature Workshop_2026.pdf"));

    let deleted = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["delete", &id])
        .output()
        .expect("Failed to execute command");
    assert!(deleted.status.success());

    let empty = cargo_bin()
        .arg("--store")
        .arg(&store)
        .arg("list")
        .output()
        .expect("Failed to execute command");
    assert!(stdout(&empty).contains("No saved proposals yet."));
}

#[test]
fn test_save_update_in_place() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");
    let first = write_json(dir.path(), "first.json", r#"{"name":"Clay"}"#);
    let second = write_json(dir.path(), "second.json", r#"{"name":"Clay and glaze"}"#);

    let saved = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["save", "--input"])
        .arg(&first)
        .output()
        .unwrap();
    let id = stdout(&saved).trim().trim_start_matches("✓ Created: ").to_string();

    let updated = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["save", "--id", &id, "--input"])
        .arg(&second)
        .output()
        .unwrap();
    assert!(updated.status.success(), "Update failed: {:?}", updated);
    assert!(stdout(&updated).contains(&format!("✓ Updated: {}", id)));

    let records: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&store).unwrap()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "Clay and glaze");
}

#[test]
fn test_save_without_name_fails() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");
    let input = write_json(dir.path(), "blank.json", r#"{"name":"   ","axes":"art"}"#);

    let output = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["save", "--input"])
        .arg(&input)
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("name is required"));
    assert!(!store.exists(), "store must not be written");
}

#[test]
fn test_unknown_id_fails() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");

    let output = cargo_bin()
        .arg("--store")
        .arg(&store)
        .args(["delete", "nope"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Proposal not found: nope"));
}

#[test]
fn test_export_needs_a_source() {
    let output = cargo_bin().arg("export").output().expect("Failed to execute command");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("nothing to export"));
}

fn run_wizard(args: &[&str], extra: &[&Path], script: &str) -> Output {
    let mut command = cargo_bin();
    command.args(args);
    for path in extra {
        command.arg(path);
    }
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn wizard");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_wizard_fills_saves_and_exports() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");
    let script = "\
name=Nature Workshop
:goto 4
+infants
+teens
:goto 6
headcount=25
duration=4 sessions of 90 min
:save
:export
:quit
";

    let output = run_wizard(
        &["wizard", "--output-dir"],
        &[dir.path(), Path::new("--store"), &store],
        script,
    );

    assert!(output.status.success(), "Wizard failed: {:?}", output);
    let out = stdout(&output);
    assert!(out.contains("[1/14] Workshop / activity name"));
    assert!(out.contains("[x] +teens"));
    assert!(out.contains("✓ Saved as "));
    assert!(out.contains("(1 pages)"));
    assert_pdf(&dir.path().join("Proposal_LaMaxima_Nature Workshop_2026.pdf"));

    let records: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&store).unwrap()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["audience"]["infants"], true);
}

#[test]
fn test_wizard_draft_survives_in_cache() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache");

    let first = run_wizard(
        &["wizard", "--cache-dir"],
        &[&cache],
        "name=Draft idea\n:goto 3\nobjectives=Plant seeds\n:quit\n",
    );
    assert!(first.status.success(), "Wizard failed: {:?}", first);
    assert!(cache.join("workshop_proposal_local.json").exists());

    let exported = cargo_bin()
        .arg("--cache-dir")
        .arg(&cache)
        .args(["export", "--output"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(exported.status.success(), "Export failed: {:?}", exported);
    assert_pdf(&dir.path().join("Proposal_LaMaxima_Draft idea_2026.pdf"));
}

#[test]
fn test_wizard_list_view_follows_saves() {
    let output = run_wizard(&["wizard"], &[], "name=Clay\n:list\n:save\n:quit\n");
    assert!(output.status.success(), "Wizard failed: {:?}", output);
    let out = stdout(&output);
    assert!(out.contains("Workshop proposal wizard."));

    let empty_at = out.find("No saved proposals yet.").expect("empty list not shown");
    let saved_at = out.find("✓ Saved as ").expect("save not reported");
    let card_at = out
        .find("  Clay\n    Duration: \u{2014} · Headcount: \u{2014}")
        .expect("live list did not refresh");
    assert!(empty_at < saved_at && saved_at < card_at);
}

#[test]
fn test_wizard_reports_rejected_save() {
    let output = run_wizard(&["wizard"], &[], ":save\n:next\n:quit\n");
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("! The workshop name is required before saving"));
    assert!(out.contains("[2/14] Brief rationale"));
}
