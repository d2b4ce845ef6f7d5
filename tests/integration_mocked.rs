/// Integration tests with mocked external APIs
/// Exercises the WhatsApp relay chain and email dispatch without hitting real services
use async_trait::async_trait;
use beylerbeyi_leads::config::WhatsAppSettings;
use beylerbeyi_leads::dispatcher::NotificationDispatcher;
use beylerbeyi_leads::errors::AppError;
use beylerbeyi_leads::mailer::{AutoReplyStatus, EmailNotifier, MailTransport};
use beylerbeyi_leads::models::{ClientInfo, LeadRecord, LeadSubmission};
use beylerbeyi_leads::whatsapp::{build_http_client, ChannelOutcome, WhatsAppRelayChain};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DESTINATION: &str = "+905525242866";

/// Helper function to create relay settings pointing at the mock server
fn create_test_settings(
    base_url: &str,
    callmebot_key: Option<&str>,
    business_api: Option<(&str, &str)>,
) -> WhatsAppSettings {
    WhatsAppSettings {
        destination: DESTINATION.to_string(),
        callmebot_api_key: callmebot_key.map(str::to_string),
        callmebot_base_url: base_url.to_string(),
        api_token: business_api.map(|(token, _)| token.to_string()),
        phone_number_id: business_api.map(|(_, id)| id.to_string()),
        api_base_url: base_url.to_string(),
    }
}

fn test_lead(email: &str) -> LeadRecord {
    let form = LeadSubmission {
        name: "Elif Kaya".to_string(),
        phone: "0532 111 22 33".to_string(),
        email: email.to_string(),
        language: Some("en".to_string()),
        unit_interest: Some("2+1".to_string()),
        kvkk_consent: Some("on".to_string()),
        utm_source: Some("instagram".to_string()),
        ..Default::default()
    };
    LeadRecord::from_submission(&form, ClientInfo::default()).unwrap()
}

/// Mail transport that records every send and optionally fails
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingTransport {
    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(to, _)| to.clone()).collect()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), subject.to_string()));
        if self.fail {
            return Err(AppError::MailError("connection refused".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_callmebot_success_stops_chain() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/whatsapp.php"))
        .and(query_param("phone", DESTINATION))
        .and(query_param("apikey", "cmb-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Message queued"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Business API must not be called once CallMeBot succeeded
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), Some("cmb-key"), Some(("tok", "123")));
    let chain = WhatsAppRelayChain::from_settings(&settings, build_http_client().unwrap());

    let report = chain.deliver("🏠 Yeni lead").await;

    assert_eq!(report.delivered_by(), Some("callmebot"));
    assert_eq!(report.attempts.len(), 1);
    assert!(report.manual_link().is_none());
}

#[tokio::test]
async fn test_callmebot_failure_falls_through_to_business_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/whatsapp.php"))
        .respond_with(ResponseTemplate::new(500).set_body_string("APIKey is invalid"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v17.0/1098765/messages"))
        .and(header("authorization", "Bearer business-token"))
        .and(body_partial_json(json!({
            "messaging_product": "whatsapp",
            "to": "905525242866",
            "type": "text",
            "text": { "body": "hello sales" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{ "id": "wamid.test" }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(
        &mock_server.uri(),
        Some("cmb-key"),
        Some(("business-token", "1098765")),
    );
    let chain = WhatsAppRelayChain::from_settings(&settings, build_http_client().unwrap());

    let report = chain.deliver("hello sales").await;

    assert_eq!(report.delivered_by(), Some("whatsapp_business_api"));
    assert_eq!(report.attempts.len(), 2);
    match &report.attempts[0].outcome {
        ChannelOutcome::Failed(detail) => assert!(detail.contains("500")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_all_relays_failing_yields_manual_link() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/whatsapp.php"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v17.0/1098765/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid OAuth access token" }
        })))
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(
        &mock_server.uri(),
        Some("cmb-key"),
        Some(("expired", "1098765")),
    );
    let chain = WhatsAppRelayChain::from_settings(&settings, build_http_client().unwrap());

    let report = chain.deliver("Yeni lead: Elif").await;

    assert_eq!(report.attempts.len(), 3);
    assert_eq!(report.delivered_by(), Some("manual_link"));
    assert_eq!(
        report.manual_link(),
        Some("https://wa.me/905525242866?text=Yeni%20lead%3A%20Elif")
    );
}

#[tokio::test]
async fn test_no_credentials_makes_no_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let settings = create_test_settings(&mock_server.uri(), None, None);
    let chain = WhatsAppRelayChain::from_settings(&settings, build_http_client().unwrap());

    let report = chain.deliver("hello").await;

    assert!(matches!(report.attempts[0].outcome, ChannelOutcome::Skipped(_)));
    assert!(matches!(report.attempts[1].outcome, ChannelOutcome::Skipped(_)));
    assert_eq!(report.delivered_by(), Some("manual_link"));
}

#[tokio::test]
async fn test_auto_reply_skipped_without_email() {
    let transport = Arc::new(RecordingTransport::default());
    let notifier = EmailNotifier::new(transport.clone(), "sales@beylerbeyi.example");

    let report = notifier.notify(&test_lead("")).await;

    assert!(report.sales_notified);
    assert_eq!(report.auto_reply, AutoReplyStatus::Skipped);
    assert_eq!(transport.recipients(), vec!["sales@beylerbeyi.example"]);
}

#[tokio::test]
async fn test_auto_reply_sent_in_lead_language() {
    let transport = Arc::new(RecordingTransport::default());
    let notifier = EmailNotifier::new(transport.clone(), "sales@beylerbeyi.example");

    let report = notifier.notify(&test_lead("elif@example.com")).await;

    assert_eq!(report.auto_reply, AutoReplyStatus::Sent);
    let sent = transport.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1, "New Lead: Elif Kaya - Beylerbeyi Residences");
    assert_eq!(sent[1].0, "elif@example.com");
    assert_eq!(sent[1].1, "Beylerbeyi Bosphorus Residences - Information Received");
}

#[tokio::test]
async fn test_mail_failure_does_not_block_whatsapp() {
    let transport = Arc::new(RecordingTransport::failing());
    let notifier = EmailNotifier::new(transport.clone(), "sales@beylerbeyi.example");
    let dispatcher =
        NotificationDispatcher::new(Some(notifier), WhatsAppRelayChain::new(DESTINATION, vec![]));

    let report = dispatcher.dispatch(&test_lead("elif@example.com")).await;

    let email = report.email.as_ref().unwrap();
    assert!(!email.sales_notified);
    assert_eq!(email.auto_reply, AutoReplyStatus::Failed);
    // Both sends were attempted despite the first failing
    assert_eq!(transport.recipients().len(), 2);
    assert!(report.delivered());
    assert!(report.manual_link().unwrap().starts_with("https://wa.me/905525242866?text="));
}

#[tokio::test]
async fn test_dispatch_without_email_configured() {
    let dispatcher = NotificationDispatcher::new(None, WhatsAppRelayChain::new(DESTINATION, vec![]));

    let report = dispatcher.dispatch(&test_lead("elif@example.com")).await;

    assert!(report.email.is_none());
    assert!(!dispatcher.email_enabled());
    assert_eq!(report.whatsapp.delivered_by(), Some("manual_link"));
}
