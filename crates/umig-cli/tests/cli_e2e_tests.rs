//! End-to-end tests for the umig binary
//!
//! Both tenants are served by one mock server; the binary runs in a scratch
//! directory with a cleared environment so no local .env leaks in.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn umig(dir: &Path, domain: &str) -> Command {
    let mut cmd = Command::cargo_bin("umig").unwrap();
    cmd.current_dir(dir).env_clear();
    for prefix in ["SOURCE", "DESTINATION"] {
        let lower = prefix.to_lowercase();
        cmd.env(format!("{prefix}_DOMAIN"), domain)
            .env(format!("{prefix}_CLIENT_ID"), format!("{lower}-id"))
            .env(format!("{prefix}_CLIENT_SECRET"), format!("{lower}-secret"))
            .env(format!("{prefix}_CONNECTION_ID"), format!("con_{lower}"));
    }
    cmd
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 86400
        })))
        .mount(server)
        .await;
}

async fn mount_job(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/jobs/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn test_missing_configuration_lists_every_variable() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("umig").unwrap();
    cmd.current_dir(dir.path())
        .env_clear()
        .env("SOURCE_DOMAIN", "source.eu.auth0.com")
        .arg("import");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("SOURCE_CLIENT_ID"))
        .stderr(predicate::str::contains("DESTINATION_CONNECTION_ID"))
        .stderr(predicate::str::contains("SOURCE_DOMAIN,").not());
}

#[test]
fn test_import_without_archive_points_to_export() {
    let dir = TempDir::new().unwrap();

    umig(dir.path(), "destination.eu.auth0.com")
        .arg("import")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Reading archive failed"))
        .stderr(predicate::str::contains("umig export"));
}

#[tokio::test]
async fn test_export_downloads_archive() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/jobs/users-exports"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "job_export",
            "status": "pending"
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_job(
        &server,
        "job_export",
        json!({
            "id": "job_export",
            "status": "completed",
            "location": format!("{}/download/users.json.gz", server.uri())
        }),
    )
    .await;

    let archive = gzip(b"{\"user_id\":\"1\",\"email\":\"a@x.com\"}\n");
    Mock::given(method("GET"))
        .and(path("/download/users.json.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    umig(dir.path(), &server.uri())
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("Archive saved"));

    let saved = std::fs::read(dir.path().join("exported_users.json.gz")).unwrap();
    assert_eq!(saved, archive);
}

#[tokio::test]
async fn test_failed_export_job_reports_step() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/jobs/users-exports"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "job_export",
            "status": "pending"
        })))
        .mount(&server)
        .await;
    mount_job(&server, "job_export", json!({ "id": "job_export", "status": "failed" })).await;

    let dir = TempDir::new().unwrap();
    umig(dir.path(), &server.uri())
        .arg("export")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Export job failed"))
        .stderr(predicate::str::contains("job_export"));

    assert!(!dir.path().join("exported_users.json.gz").exists());
}

#[tokio::test]
async fn test_import_aborts_on_failed_batch() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/jobs/users-imports"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "job_import_1",
            "status": "pending"
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    // A third start would also land here and break the expectation.
    Mock::given(method("POST"))
        .and(path("/api/v2/jobs/users-imports"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "job_import_2",
            "status": "pending"
        })))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    mount_job(
        &server,
        "job_import_1",
        json!({
            "id": "job_import_1",
            "status": "completed",
            "summary": { "failed": 0, "updated": 0, "inserted": 1, "total": 1 }
        }),
    )
    .await;
    mount_job(&server, "job_import_2", json!({ "id": "job_import_2", "status": "failed" })).await;

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("exported_users.json.gz"),
        gzip(b"{\"user_id\":\"1\"}\n{\"user_id\":\"2\"}\n{\"user_id\":\"3\"}\n"),
    )
    .unwrap();

    umig(dir.path(), &server.uri())
        .args(["import", "--max-batch-bytes", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Import of batch 2/3 failed"));
}

#[tokio::test]
async fn test_import_replays_archive() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/jobs/users-imports"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "job_import",
            "status": "pending"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(
        &server,
        "job_import",
        json!({
            "id": "job_import",
            "status": "completed",
            "summary": { "failed": 0, "updated": 1, "inserted": 1, "total": 2 }
        }),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("users.json.gz");
    std::fs::write(
        &archive,
        gzip(b"{\"user_id\":\"1\",\"email\":\"a@x.com\"}\n{\"user_id\":\"2\",\"email\":\"b@x.com\"}\n"),
    )
    .unwrap();

    umig(dir.path(), &server.uri())
        .arg("import")
        .arg("--archive")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 user(s) in 1 batch(es)"))
        .stdout(predicate::str::contains("1 inserted, 1 updated, 0 failed"));
}
