use crate::config::Config;
use crate::db::Database;
use crate::dispatcher::{DispatchReport, NotificationDispatcher};
use crate::errors::AppError;
use crate::i18n::{supported_languages, TranslationMap, Translations};
use crate::lead_store::{LeadStore, NoopLeadStore, PgLeadStore};
use crate::mailer::{EmailNotifier, SmtpMailer};
use crate::models::*;
use crate::whatsapp::{build_http_client, WhatsAppRelayChain};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    Form, Json,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// PostgreSQL store, or a no-op store when no database is configured.
    pub store: Arc<dyn LeadStore>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub translations: Translations,
}

impl AppState {
    /// Wire store, mailer and relay chain from configuration.
    ///
    /// A missing or unreachable database downgrades to [`NoopLeadStore`];
    /// missing mail credentials disable email.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn LeadStore> = match config.database_url.as_deref() {
            Some(url) => match Database::new(url).await {
                Ok(db) => {
                    tracing::info!("✓ Database connection pool established");
                    Arc::new(PgLeadStore::new(db.pool))
                }
                Err(e) => {
                    tracing::error!("Database unavailable, running without persistence: {:#}", e);
                    Arc::new(NoopLeadStore)
                }
            },
            None => {
                tracing::warn!("⚠️  DATABASE_URL not set, leads will not be stored");
                Arc::new(NoopLeadStore)
            }
        };

        let email = SmtpMailer::from_settings(&config.mail)?.map(|mailer| {
            tracing::info!("✓ SMTP mailer initialized: {}", config.mail.server);
            EmailNotifier::new(Arc::new(mailer), config.sales_email.clone())
        });
        if email.is_none() {
            tracing::warn!("⚠️  Mail sender not configured, email notifications disabled");
        }

        let whatsapp = WhatsAppRelayChain::from_settings(&config.whatsapp, build_http_client()?);
        tracing::info!(
            "✓ WhatsApp relay chain: {}",
            whatsapp.channel_names().join(" → ")
        );

        let translations = Translations::new(config.lang_dir.clone());

        Ok(Self {
            config,
            store,
            dispatcher: Arc::new(NotificationDispatcher::new(email, whatsapp)),
            translations,
        })
    }
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "beylerbeyi-leads",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "persistence": state.store.is_persistent(),
            "email": state.dispatcher.email_enabled(),
        })),
    )
}

/// Client metadata for a submission.
///
/// The address comes from the first `X-Forwarded-For` entry or `X-Real-IP` when
/// it parses as an IP address, otherwise from the socket peer.
pub fn client_info(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientInfo {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let forwarded = header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .or_else(|| header_str("x-real-ip"))
        .and_then(|ip| match ip.trim().parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::debug!("Ignoring unparseable forwarded address");
                None
            }
        });

    ClientInfo {
        ip_address: forwarded
            .or_else(|| peer.map(|addr| addr.ip()))
            .map(|ip| ip.to_string()),
        user_agent: header_str(header::USER_AGENT.as_str()).map(str::to_string),
    }
}

fn success_message(language: Language, callback: bool) -> &'static str {
    match (language, callback) {
        (Language::Tr, false) => "Teşekkürler! En kısa sürede sizinle iletişime geçeceğiz.",
        (Language::Tr, true) => "Geri arama talebiniz alındı.",
        (Language::En, false) => "Thank you! We will contact you soon.",
        (Language::En, true) => "Callback requested successfully",
        (Language::Ar, false) => "شكراً لك! سنتواصل معك قريباً.",
        (Language::Ar, true) => "تم استلام طلب معاودة الاتصال.",
    }
}

/// Store the lead, then notify. Notification problems never fail the request.
async fn accept_lead(state: &AppState, lead: LeadRecord) -> Result<SubmissionResponse, AppError> {
    let lead_id = state.store.save(&lead).await?;

    let report: DispatchReport = state.dispatcher.dispatch(&lead).await;
    if !report.delivered() {
        tracing::warn!("⚠️  No notification channel succeeded for lead {}", lead.reference());
    }

    Ok(SubmissionResponse {
        success: true,
        message: success_message(lead.language(), lead.is_callback()).to_string(),
        reference: Some(lead.reference()),
        lead_id,
        whatsapp_link: report.manual_link().map(str::to_string),
    })
}

/// POST /submit-lead
///
/// Full landing-page form. Responds 422 with a localized message when the
/// submission is rejected.
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(form): Form<LeadSubmission>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let language = form.language();
    tracing::info!("POST /submit-lead (language={})", language);

    let client = client_info(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let lead = LeadRecord::from_submission(&form, client)
        .map_err(|kind| AppError::validation(kind, language))?;

    Ok(Json(accept_lead(&state, lead).await?))
}

/// POST /callback-request
pub async fn callback_request(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(form): Form<CallbackSubmission>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let language = form.language();
    tracing::info!("POST /callback-request (language={})", language);

    let client = client_info(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let lead = LeadRecord::from_callback(&form, client)
        .map_err(|kind| AppError::validation(kind, language))?;

    Ok(Json(accept_lead(&state, lead).await?))
}

/// GET /api/v1/translations/:lang
///
/// Unsupported languages get the Turkish translations.
pub async fn get_translations(
    State(state): State<Arc<AppState>>,
    Path(lang): Path<String>,
) -> Json<serde_json::Value> {
    let language = Language::from_code_or_default(Some(&lang));
    let translations: Arc<TranslationMap> = state.translations.load(language).await;

    Json(json!({
        "language": language,
        "supported_languages": supported_languages(),
        "translations": &*translations,
    }))
}

fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Validate the X-Admin-Token header against ADMIN_TOKEN.
///
/// Both sides are hashed first so the comparison length does not depend on the
/// secret.
fn validate_admin_token(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let expected = config
        .admin_token
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("ADMIN_TOKEN not configured".to_string()))?;

    let provided = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Admin-Token header".to_string()))?;

    if !constant_time_compare(&sha256_hex(provided), &sha256_hex(expected)) {
        return Err(AppError::Unauthorized("Invalid admin token".to_string()));
    }

    Ok(())
}

/// Sample lead used to exercise the WhatsApp chain.
pub fn sample_lead() -> Result<LeadRecord, AppError> {
    let form = LeadSubmission {
        name: "Test Müşteri".to_string(),
        phone: "05551234567".to_string(),
        email: "test@example.com".to_string(),
        language: Some("tr".to_string()),
        unit_interest: Some("3+1 Daire".to_string()),
        budget_range: Some("5-7 Milyon TL".to_string()),
        timeline: Some("6 ay içinde".to_string()),
        best_call_time: Some("Sabah 09:00-12:00".to_string()),
        whatsapp_optin: Some("on".to_string()),
        marketing_consent: Some("on".to_string()),
        kvkk_consent: Some("on".to_string()),
        utm_source: Some("test".to_string()),
        utm_medium: Some("manual".to_string()),
        utm_campaign: Some("whatsapp_test".to_string()),
        ..Default::default()
    };
    let client = ClientInfo {
        ip_address: Some("127.0.0.1".to_string()),
        user_agent: Some("Test Agent".to_string()),
    };

    LeadRecord::from_submission(&form, client)
        .map_err(|kind| AppError::InternalError(format!("sample lead rejected: {}", kind.key())))
}

/// GET /admin/test-whatsapp
///
/// Sends a sample lead through the WhatsApp chain only.
pub async fn test_whatsapp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    validate_admin_token(&state.config, &headers)?;

    let lead = sample_lead()?;
    let report = state.dispatcher.dispatch_whatsapp(&lead).await;

    Ok(Json(json!({
        "status": "success",
        "delivered_by": report.delivered_by(),
        "report": report,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
