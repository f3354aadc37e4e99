//! CLI tests for the document commands: `check`, `build`, `format`, `tag`.

use std::fs;
use std::process::Command;

use assert_cmd::cargo;

const DOC: &str = "\
:regionsparam: pname:pRegions

[open,refpage='vkCmdCopyBuffer',desc='Copy data between buffer regions',type='protos']
--
.Valid Usage
****
  * [[VUID-vkCmdCopyBuffer-pRegions-00001]]
    codified-vu
    require(macro(regionsparam) != NULL)
  * codified-vu
    if is_version(1, 1):
      require(regionCount > 0)
****
--
";

fn vu_cmd() -> Command {
    Command::new(cargo::cargo_bin!("vu"))
}

fn write_temp(name: &str, content: &str) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write temp file");
    (dir, path.to_string_lossy().to_string())
}

fn registry_path() -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata/registry.json");
    path.to_string_lossy().to_string()
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid json ({e}): {stdout}"))
}

#[test]
fn check_accepts_a_valid_document() {
    let (_dir, path) = write_temp("copies.adoc", DOC);
    let output = vu_cmd()
        .args(["check", &path, "--registry", &registry_path(), "--output", "json"])
        .output()
        .expect("run check");
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json = json_stdout(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["vus"], 2);
}

#[test]
fn check_reports_located_errors_and_exits_1() {
    let doc = DOC.replace("regionCount > 0", "nope > 0");
    let (_dir, path) = write_temp("copies.adoc", &doc);
    let output = vu_cmd()
        .args(["check", &path, "--registry", &registry_path(), "--output", "json"])
        .output()
        .expect("run check");
    assert_eq!(output.status.code(), Some(1));
    let json = json_stdout(&output);
    assert_eq!(json["ok"], false);
    let d = &json["diagnostics"][0];
    assert_eq!(d["id"], "VU2008");
    assert_eq!(d["location"]["line"], 12);
}

#[test]
fn build_follows_the_configuration() {
    let (_dir, path) = write_temp("copies.adoc", DOC);
    let output = vu_cmd()
        .args([
            "build",
            &path,
            "--registry",
            &registry_path(),
            "--version",
            "VK_VERSION_1_0",
            "--output",
            "json",
        ])
        .output()
        .expect("run build");
    assert!(output.status.success());
    let json = json_stdout(&output);
    let vus = json["vus"].as_array().expect("vus array");
    assert_eq!(vus.len(), 2);
    assert_eq!(vus[0]["outcome"], "built");
    assert_eq!(vus[0]["line"], 9);
    assert!(vus[0]["output"].as_str().unwrap().contains("pname:pRegions"));
    assert_eq!(vus[1]["outcome"], "eliminated");

    let output = vu_cmd()
        .args([
            "build",
            &path,
            "--registry",
            &registry_path(),
            "--version",
            "VK_VERSION_1_1",
            "--style",
            "text",
            "--output",
            "pretty",
        ])
        .output()
        .expect("run build");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("* pname:pRegions must: not be `NULL`"), "{stdout}");
    assert!(!stdout.contains("eliminated"), "{stdout}");
}

#[test]
fn standalone_vus_need_an_api() {
    let (_dir, path) = write_temp("one.vu", "require(pCreateInfo != NULL)\n");
    let output = vu_cmd()
        .args(["check", &path, "--registry", &registry_path()])
        .output()
        .expect("run check");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--api"));

    let output = vu_cmd()
        .args([
            "check",
            &path,
            "--registry",
            &registry_path(),
            "--api",
            "vkCreateImage",
            "--output",
            "json",
        ])
        .output()
        .expect("run check");
    assert!(output.status.success());
}

#[test]
fn format_check_and_write() {
    let messy = DOC.replace("require(macro(regionsparam) != NULL)", "require( macro(regionsparam)!=NULL )");
    let (_dir, path) = write_temp("copies.adoc", &messy);

    let output = vu_cmd()
        .args(["format", &path, "--check", "--output", "json"])
        .output()
        .expect("run format --check");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json_stdout(&output)["status"], "not formatted");

    let output = vu_cmd()
        .args(["format", &path, "--write", "--output", "json"])
        .output()
        .expect("run format --write");
    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["status"], "formatted");
    assert_eq!(fs::read_to_string(&path).unwrap(), DOC);

    let output = vu_cmd()
        .args(["format", &path, "--check", "--output", "json"])
        .output()
        .expect("run format --check");
    assert!(output.status.success());
}

#[test]
fn tags_name_the_first_parameter() {
    let (_dir, path) = write_temp("copies.adoc", DOC);
    let output = vu_cmd()
        .args(["tag", &path, "--output", "json"])
        .output()
        .expect("run tag");
    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["vus"][0]["tag"], "{regionsparam}");
    assert_eq!(json["vus"][1]["tag"], "regionCount");
}

#[test]
fn parse_prints_the_ast() {
    let (_dir, path) = write_temp("one.vu", "codified-vu\nrequire(a == 1)\n");
    let output = vu_cmd()
        .args(["parse", &path, "--output", "json"])
        .output()
        .expect("run parse");
    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["vus"][0]["line"], 2);
    assert!(json["vus"][0]["ast"]["body"].is_array());
}
