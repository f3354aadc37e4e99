//! CLI tests for `vu explain` and the `vu serve` protocol.

use std::io::Write;
use std::process::{Command, Stdio};

use assert_cmd::cargo;

fn vu_cmd() -> Command {
    Command::new(cargo::cargo_bin!("vu"))
}

fn registry_path() -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata/registry.json");
    path.to_string_lossy().to_string()
}

#[test]
fn explain_known_code_json_returns_explanation() {
    let output = vu_cmd()
        .args(["explain", "VU2005", "--output", "json"])
        .output()
        .expect("run explain command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(json["id"], "VU2005");
    assert!(json["explanation"].is_string());
}

#[test]
fn explain_unknown_code_json_returns_null_explanation() {
    let output = vu_cmd()
        .args(["explain", "VU9999", "--output", "json"])
        .output()
        .expect("run explain command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert!(json["explanation"].is_null());
}

#[test]
fn serve_session() {
    let mut child = vu_cmd()
        .args(["serve", "--registry", &registry_path()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn serve");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(
            b"VERSIONS\nVK_VERSION_1_0\n\nVERSIONS-END\n\
              FORMAT-VU\nvkCreateImage\nimage.adoc\n7\n\ncodified-vu\nrequire(pCreateInfo != NULL)\nFORMAT-VU-END\n\
              FORMAT-VU\nvkCreateImage\nimage.adoc\n20\n\nrequire(pCreateInfo.nope == 1)\nFORMAT-VU-END\n\
              EXIT\n",
        )
        .expect("write requests");
    let output = child.wait_with_output().expect("wait for serve");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "VERSIONS-SUCCESS");
    assert_eq!(lines[1], "FORMAT-VU");
    assert!(lines.contains(&"FORMAT-VU-SUCCESS"), "{stdout}");
    assert!(lines.contains(&"* pname:pCreateInfo must: not be `NULL`"), "{stdout}");
    assert_eq!(lines.last(), Some(&"FORMAT-VU-FAIL"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("image.adoc:20"), "{stderr}");
    assert!(stderr.contains("VU2011"), "{stderr}");
}
