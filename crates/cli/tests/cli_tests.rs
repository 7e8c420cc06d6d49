// End-to-end tests for the `mediarecon` binary against a mock repository.
// Run with: cargo test -p mediarecon-cli --test cli_tests

use std::io::Write;
use std::process::{Command, Output, Stdio};

use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};

fn mediarecon() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mediarecon"));
    cmd.env_remove("MEDIARECON_CONFIG").env("NO_COLOR", "1");
    cmd
}

/// Config pointing both APIs at `server`.
fn config_for(server: &MockServer, extra: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[endpoints]\ncommons_api = \"{}\"\nwikidata_api = \"{}\"\nservice_url = \"https://recon.example.org\"\n{}",
        server.url("/w/api.php"),
        server.url("/wikidata/api.php"),
        extra
    )
    .unwrap();
    file
}

fn run(config: &NamedTempFile, args: &[&str]) -> Output {
    mediarecon()
        .arg("--config")
        .arg(config.path())
        .args(args)
        .output()
        .expect("run mediarecon")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// manifest
// ---------------------------------------------------------------------------

#[test]
fn manifest_uses_configured_service_url() {
    let server = MockServer::start();
    let config = config_for(&server, "");

    let output = run(&config, &["manifest", "--lang", "de"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let manifest = stdout_json(&output);
    assert_eq!(manifest["name"], "Wikimedia Commons");
    assert_eq!(manifest["identifierSpace"], "https://commons.wikimedia.org/entity/");
    assert_eq!(manifest["preview"]["url"], "https://recon.example.org/de/api/preview?id={{id}}");
    assert_eq!(manifest["suggest"]["entity"]["service_path"], "/suggest/entity");
}

#[test]
fn bad_lang_flag_is_usage_error() {
    let server = MockServer::start();
    let config = config_for(&server, "");

    let output = run(&config, &["propose-properties", "--lang", "english!"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--lang"), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());
}

#[test]
fn manifest_without_config_file_uses_defaults() {
    let home = TempDir::new().unwrap();
    let output = mediarecon()
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .args(["manifest", "--service-url", "https://other.example.org/"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let manifest = stdout_json(&output);
    assert_eq!(manifest["extend"]["propose_properties"]["service_url"], "https://other.example.org/en/api");
    assert_eq!(manifest["preview"]["width"], 400);
}

// ---------------------------------------------------------------------------
// query
// ---------------------------------------------------------------------------

#[test]
fn query_matches_found_title_and_leaves_missing_empty() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("action", "query")
            .query_param("titles", "File:Commons-logo.svg|File:Missing.jpg");
        then.status(200).json_body(json!({"query": {"pages": {
            "317966": {"pageid": 317966, "ns": 6, "title": "File:Commons-logo.svg"},
            "-1": {"ns": 6, "title": "File:Missing.jpg", "missing": ""}
        }}}));
    });
    let config = config_for(&server, "");

    let output = run(
        &config,
        &["query", r#"{"q0":{"query":"Commons-logo.svg"},"q1":{"query":"image:Missing.jpg"}}"#],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert();

    let body = stdout_json(&output);
    assert_eq!(
        body["q0"],
        json!({"result": [{"id": "M317966", "name": "File:Commons-logo.svg", "score": 100, "match": true}]})
    );
    assert_eq!(body["q1"], json!({"result": []}));
}

#[test]
fn query_reads_stdin() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("titles", "File:Commons-logo.svg");
        then.status(200).json_body(json!({"query": {"pages": {
            "317966": {"pageid": 317966, "ns": 6, "title": "File:Commons-logo.svg"}
        }}}));
    });
    let config = config_for(&server, "");

    let mut child = mediarecon()
        .arg("--config")
        .arg(config.path())
        .args(["query", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(br#"{"q0":{"query":"https://commons.wikimedia.org/wiki/File:Commons-logo.svg"}}"#)
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert();
    let body = stdout_json(&output);
    assert_eq!(body["q0"]["result"][0]["id"], "M317966");
    assert_eq!(body["q0"]["result"][0]["match"], true);
    assert_eq!(body["q0"]["result"][0]["score"], 100);
}

#[test]
fn malformed_query_exits_invalid_input() {
    let server = MockServer::start();
    let config = config_for(&server, "");

    let output = run(&config, &["query", "{not json"]);
    assert_eq!(output.status.code(), Some(3));
    let err = stderr(&output);
    assert!(err.contains(r#""error":"invalid_input""#), "stderr: {err}");
    assert!(err.contains("Invalid input provided"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
}

#[test]
fn remote_failure_exits_remote() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/w/api.php");
        then.status(500).body("boom");
    });
    let config = config_for(&server, "");

    let output = run(&config, &["query", r#"{"q0":{"query":"File:Foo.jpg"}}"#]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains(r#""error":"remote""#), "stderr: {}", stderr(&output));
}

// ---------------------------------------------------------------------------
// extend
// ---------------------------------------------------------------------------

#[test]
fn empty_extend_prints_empty_object() {
    let server = MockServer::start();
    let config = config_for(&server, "");

    let output = run(&config, &["extend", "{}"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout_json(&output), json!({}));
}

#[test]
fn extend_wikitext_column() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("action", "parse")
            .query_param("pageid", "317966");
        then.status(200).json_body(json!({"parse": {
            "title": "File:Commons-logo.svg",
            "pageid": 317966,
            "wikitext": {"*": "== Summary ==\n{{Information}}"}
        }}));
    });
    let config = config_for(&server, "");

    let output = run(&config, &["extend", r#"{"ids":["M317966"],"properties":[{"id":"wikitext"}]}"#]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let body = stdout_json(&output);
    assert_eq!(body["meta"][0], json!({"id": "wikitext", "name": "Wikitext"}));
    assert_eq!(body["rows"]["M317966"]["wikitext"][0]["str"], "== Summary ==\n{{Information}}");
}

#[test]
fn extend_rejects_non_media_id() {
    let server = MockServer::start();
    let config = config_for(&server, "");

    let output = run(&config, &["extend", r#"{"ids":["Q42"],"properties":[{"id":"P180"}]}"#]);
    assert_eq!(output.status.code(), Some(3));
}

// ---------------------------------------------------------------------------
// suggest / proposals
// ---------------------------------------------------------------------------

#[test]
fn suggest_entities_lists_files() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("list", "search")
            .query_param("srsearch", "Commons-logo")
            .query_param("srnamespace", "6");
        then.status(200).json_body(json!({"query": {"search": [
            {"ns": 6, "title": "File:Commons-logo.svg", "pageid": 317966}
        ]}}));
    });
    let config = config_for(&server, "");

    let output = run(&config, &["suggest-entities", "Commons-logo"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert();
    assert_eq!(
        stdout_json(&output),
        json!({"result": [{"id": "M317966", "name": "File:Commons-logo.svg"}]})
    );
}

#[test]
fn propose_properties_labels_configured_list() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/wikidata/api.php")
            .query_param("action", "wbgetentities")
            .query_param("ids", "P180");
        then.status(200).json_body(json!({"entities": {
            "P180": {"id": "P180", "labels": {"en": {"language": "en", "value": "depicts"}}}
        }}));
    });
    let config = config_for(&server, "[proposals]\nproperties = [\"wikitext\", \"P180\"]\n");

    let output = run(&config, &["propose-properties"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout_json(&output),
        json!({"type": "mediafile", "properties": [
            {"id": "wikitext", "name": "Wikitext"},
            {"id": "P180", "name": "depicts"}
        ]})
    );
}

// ---------------------------------------------------------------------------
// preview
// ---------------------------------------------------------------------------

#[test]
fn preview_prints_html() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("pageids", "317966")
            .query_param("prop", "imageinfo");
        then.status(200).json_body(json!({"query": {"pages": {
            "317966": {
                "pageid": 317966,
                "ns": 6,
                "title": "File:Commons-logo.svg",
                "imageinfo": [{
                    "size": 932,
                    "width": 1024,
                    "height": 1376,
                    "url": "https://upload.wikimedia.org/wikipedia/commons/4/4a/Commons-logo.svg"
                }]
            }
        }}}));
    });
    let config = config_for(&server, "");

    let output = run(&config, &["preview", "M317966"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let html = String::from_utf8_lossy(&output.stdout);
    assert!(html.starts_with("<html>"), "html: {html}");
    assert!(html.contains(r#"<img src="https://upload.wikimedia.org/wikipedia/commons/4/4a/Commons-logo.svg""#));
    assert!(html.contains("File:Commons-logo.svg"));
}

#[test]
fn preview_of_missing_file_exits_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/w/api.php").query_param("pageids", "999999999");
        then.status(200).json_body(json!({"query": {"pages": {
            "999999999": {"pageid": 999999999, "missing": ""}
        }}}));
    });
    let config = config_for(&server, "");

    let output = run(&config, &["preview", "M999999999"]);
    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.contains(r#""error":"not_found""#), "stderr: {err}");
    assert!(err.contains("M999999999"), "stderr: {err}");
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn invalid_config_exits_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[service]\nbatch_size = 500").unwrap();

    let output = mediarecon().arg("--config").arg(file.path()).arg("manifest").output().unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(stderr(&output).contains("batch_size"));
}

#[test]
fn missing_config_file_exits_config_error() {
    let dir = TempDir::new().unwrap();
    let output = mediarecon()
        .env("MEDIARECON_CONFIG", dir.path().join("absent.toml"))
        .arg("manifest")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(stderr(&output).contains("MEDIARECON_CONFIG"));
}
