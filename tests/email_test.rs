mod common;

use std::sync::Arc;

use common::RecordingMailer;
use gigit::email::{Mailer, OutgoingEmail, Postmaster, ResendMailer};
use gigit::error::MarketplaceError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn email() -> OutgoingEmail {
    OutgoingEmail {
        to: "ada@example.com".to_string(),
        subject: "Welcome to GigIt!".to_string(),
        html: "<p>Hi Ada,</p>".to_string(),
    }
}

#[tokio::test]
async fn test_resend_mailer_posts_message() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test_key"))
        .and(body_partial_json(json!({
            "from": "GigIt <noreply@gigit.test>",
            "to": ["ada@example.com"],
            "subject": "Welcome to GigIt!"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_123" })))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = ResendMailer::new(&format!("{}/", server.uri()), "re_test_key", "GigIt <noreply@gigit.test>");
    mailer.send(email()).await?;
    Ok(())
}

#[tokio::test]
async fn test_resend_mailer_reports_provider_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid from address"))
        .mount(&server)
        .await;

    let mailer = ResendMailer::new(&server.uri(), "re_test_key", "not-an-address");
    match mailer.send(email()).await {
        Err(MarketplaceError::EmailError(msg)) => assert!(msg.contains("invalid from address")),
        other => panic!("expected email error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_postmaster_links_use_app_url() -> Result<(), Box<dyn std::error::Error>> {
    let mailer = Arc::new(RecordingMailer::default());
    let postmaster = Postmaster::new(mailer.clone(), "https://gigit.example/");

    postmaster.send_verification("ada@example.com", Some("Ada"), "verify-token").await?;
    postmaster.send_password_reset("ada@example.com", None, "reset-token").await?;
    postmaster.send_welcome("ada@example.com", Some("Ada")).await?;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].html.contains("https://gigit.example/verify-email?token=verify-token"));
    assert!(sent[1].html.contains("https://gigit.example/reset-password?token=reset-token"));
    assert!(sent[2].html.contains("https://gigit.example/login"));
    assert!(sent.iter().all(|e| e.to == "ada@example.com"));
    Ok(())
}
