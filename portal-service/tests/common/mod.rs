#![allow(dead_code)]

use portal_service::config::PortalConfig;
use portal_service::services::drive::DriveClient;
use portal_service::services::drive::mock::MockDrive;
use portal_service::services::providers::TextProvider;
use portal_service::startup::Application;
use std::sync::Arc;
use std::time::Duration;

pub const TENANT_DB: &str = r#"{
    "demo": {"folder_id": "folder-demo", "class": "demo"},
    "acme": {"folder_id": "folder-acme"}
}"#;

/// Spawn the application on a random port with injected collaborators
/// and return the port number.
pub async fn spawn_app(drive: Arc<dyn DriveClient>, provider: Arc<dyn TextProvider>) -> u16 {
    // Set test environment variables
    std::env::set_var("ENVIRONMENT", "test");
    std::env::set_var("APP__PORT", "0"); // Random port
    std::env::set_var("GEMINI_API_KEY", "test-api-key");
    std::env::set_var("GOOGLE_SERVICE_ACCOUNT_JSON", "{}");
    std::env::set_var("TENANT_DATABASE_JSON", TENANT_DB);

    let config = PortalConfig::load().expect("Failed to load config");
    let app = Application::build_with_collaborators(config, drive, provider)
        .await
        .expect("Failed to build application");

    let port = app.port();

    // Spawn the server in the background
    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    port
}

/// A small tenant tree: two readable transcripts (one nested), one
/// unreadable file, and one demo folder.
pub fn seeded_drive() -> Arc<MockDrive> {
    let drive = MockDrive::new();
    drive.insert_file(
        "folder-acme",
        "f1",
        "interviews.txt",
        "text/plain",
        b"Participant 7 said the onboarding was confusing.",
    );
    drive.insert_subfolder("folder-acme", "wave2", "wave2");
    drive.insert_file(
        "wave2",
        "f2",
        "wave2-notes.txt",
        "text/plain",
        b"Participant 9 said the pricing felt fair.",
    );
    drive.insert_file("folder-acme", "f3", "broken.txt", "text/plain", b"unused");
    drive.fail_file("f3");

    drive.insert_file(
        "folder-demo",
        "d1",
        "sample.txt",
        "text/plain",
        b"A short demo transcript.",
    );

    Arc::new(drive)
}

pub async fn create_session(
    client: &reqwest::Client,
    port: u16,
    access_id: &str,
) -> reqwest::Response {
    client
        .post(format!("http://localhost:{}/sessions", port))
        .json(&serde_json::json!({ "access_id": access_id }))
        .send()
        .await
        .expect("Failed to send create-session request")
}

pub async fn ask(
    client: &reqwest::Client,
    port: u16,
    session_id: &str,
    question: &str,
) -> reqwest::Response {
    client
        .post(format!(
            "http://localhost:{}/sessions/{}/messages",
            port, session_id
        ))
        .json(&serde_json::json!({ "question": question }))
        .send()
        .await
        .expect("Failed to send ask request")
}
