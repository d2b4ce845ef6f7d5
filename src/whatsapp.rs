//! WhatsApp relay chain.
//!
//! A lead summary is pushed through an ordered list of channels and the first
//! success wins: CallMeBot relay → WhatsApp Business Cloud API → manual wa.me
//! link. The manual link never fails, so every run ends with something the
//! sales team can act on.

use crate::config::WhatsAppSettings;
use crate::errors::AppError;
use crate::models::LeadRecord;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

const RELAY_TIMEOUT: Duration = Duration::from_secs(15);
const BUSINESS_API_VERSION: &str = "v17.0";
const MANUAL_LINK_DOMAIN: &str = "wa.me";

/// Result of one channel attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ChannelOutcome {
    /// Delivered programmatically.
    Sent,
    /// A link the operator can open to send the message by hand.
    ManualLink(String),
    /// Not attempted (missing credentials).
    Skipped(String),
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ChannelOutcome::Sent | ChannelOutcome::ManualLink(_))
    }
}

/// One link of the relay chain.
#[async_trait]
pub trait RelayChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Try to deliver `message` to `destination` (E.164). Never returns an error:
    /// failures are reported through the outcome.
    async fn attempt(&self, destination: &str, message: &str) -> ChannelOutcome;
}

/// Shared HTTP client for relay calls.
pub fn build_http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(RELAY_TIMEOUT)
        .build()
        .map_err(|e| AppError::ExternalApiError(format!("Failed to create relay client: {}", e)))
}

async fn failure_from_response(response: reqwest::Response) -> ChannelOutcome {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    ChannelOutcome::Failed(format!("HTTP {}: {}", status, error_text.trim()))
}

/// CallMeBot free WhatsApp relay (`GET /whatsapp.php`).
pub struct CallMeBotRelay {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CallMeBotRelay {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl RelayChannel for CallMeBotRelay {
    fn name(&self) -> &'static str {
        "callmebot"
    }

    async fn attempt(&self, destination: &str, message: &str) -> ChannelOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(
                "💡 CALLMEBOT_API_KEY not set. To enable automatic WhatsApp delivery: \
                 add the CallMeBot number to your contacts, send it \"I allow callmebot to send me messages\", \
                 then put the API key you receive into CALLMEBOT_API_KEY"
            );
            return ChannelOutcome::Skipped("CALLMEBOT_API_KEY not configured".to_string());
        };

        let url = format!("{}/whatsapp.php", self.base_url);
        tracing::info!("Sending WhatsApp via CallMeBot to {}", destination);

        let response = match self
            .client
            .get(&url)
            .query(&[("phone", destination), ("text", message), ("apikey", api_key)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("⚠️  CallMeBot request failed: {}", e);
                return ChannelOutcome::Failed(format!("request failed: {}", e));
            }
        };

        if response.status() == StatusCode::OK {
            tracing::info!("✓ WhatsApp sent via CallMeBot");
            ChannelOutcome::Sent
        } else {
            let outcome = failure_from_response(response).await;
            tracing::warn!("⚠️  CallMeBot rejected message: {:?}", outcome);
            outcome
        }
    }
}

/// WhatsApp Business Cloud API (`POST /{version}/{phone_number_id}/messages`).
pub struct BusinessApiRelay {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    phone_number_id: Option<String>,
}

impl BusinessApiRelay {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
        phone_number_id: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
            phone_number_id,
        }
    }
}

#[async_trait]
impl RelayChannel for BusinessApiRelay {
    fn name(&self) -> &'static str {
        "whatsapp_business_api"
    }

    async fn attempt(&self, destination: &str, message: &str) -> ChannelOutcome {
        let (Some(token), Some(phone_number_id)) = (&self.token, &self.phone_number_id) else {
            tracing::debug!("WhatsApp Business API not configured, skipping");
            return ChannelOutcome::Skipped(
                "WHATSAPP_API_TOKEN / WHATSAPP_PHONE_NUMBER_ID not configured".to_string(),
            );
        };

        let url = format!(
            "{}/{}/{}/messages",
            self.base_url, BUSINESS_API_VERSION, phone_number_id
        );
        let to: String = destination.chars().filter(|c| c.is_ascii_digit()).collect();
        let body = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": message }
        });

        let response = match self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("⚠️  WhatsApp Business API request failed: {}", e);
                return ChannelOutcome::Failed(format!("request failed: {}", e));
            }
        };

        if response.status() == StatusCode::OK {
            tracing::info!("✓ WhatsApp sent via Business API");
            ChannelOutcome::Sent
        } else {
            let outcome = failure_from_response(response).await;
            tracing::warn!("⚠️  WhatsApp Business API rejected message: {:?}", outcome);
            outcome
        }
    }
}

/// Click-to-chat link for sending `message` by hand.
pub fn build_manual_link(destination: &str, message: &str) -> String {
    let digits: String = destination.chars().filter(|c| c.is_ascii_digit()).collect();
    format!(
        "https://{}/{}?text={}",
        MANUAL_LINK_DOMAIN,
        digits,
        urlencoding::encode(message)
    )
}

/// Last link of the chain: surfaces a wa.me link to the operator log.
pub struct ManualLinkChannel;

#[async_trait]
impl RelayChannel for ManualLinkChannel {
    fn name(&self) -> &'static str {
        "manual_link"
    }

    async fn attempt(&self, destination: &str, message: &str) -> ChannelOutcome {
        let link = build_manual_link(destination, message);
        tracing::info!("📱 Send this lead manually via WhatsApp: {}", link);
        ChannelOutcome::ManualLink(link)
    }
}

/// One recorded attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelAttempt {
    pub channel: &'static str,
    pub outcome: ChannelOutcome,
}

/// Outcome of one run of the relay chain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelayReport {
    pub attempts: Vec<ChannelAttempt>,
}

impl RelayReport {
    /// The channel that succeeded, if any.
    pub fn delivered_by(&self) -> Option<&'static str> {
        self.attempts
            .iter()
            .find(|a| a.outcome.is_success())
            .map(|a| a.channel)
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered_by().is_some()
    }

    pub fn manual_link(&self) -> Option<&str> {
        self.attempts.iter().find_map(|a| match &a.outcome {
            ChannelOutcome::ManualLink(link) => Some(link.as_str()),
            _ => None,
        })
    }
}

/// Ordered fallback chain; always terminated by [`ManualLinkChannel`].
pub struct WhatsAppRelayChain {
    destination: String,
    channels: Vec<Box<dyn RelayChannel>>,
}

impl WhatsAppRelayChain {
    /// Chain of the given automated channels followed by the manual link.
    pub fn new(destination: impl Into<String>, mut channels: Vec<Box<dyn RelayChannel>>) -> Self {
        channels.push(Box::new(ManualLinkChannel));
        Self {
            destination: destination.into(),
            channels,
        }
    }

    /// CallMeBot → Business API → manual link, configured from settings.
    pub fn from_settings(settings: &WhatsAppSettings, client: reqwest::Client) -> Self {
        let channels: Vec<Box<dyn RelayChannel>> = vec![
            Box::new(CallMeBotRelay::new(
                client.clone(),
                settings.callmebot_base_url.clone(),
                settings.callmebot_api_key.clone(),
            )),
            Box::new(BusinessApiRelay::new(
                client,
                settings.api_base_url.clone(),
                settings.api_token.clone(),
                settings.phone_number_id.clone(),
            )),
        ];
        Self::new(settings.destination.clone(), channels)
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Walk the chain until a channel succeeds.
    pub async fn deliver(&self, message: &str) -> RelayReport {
        let mut report = RelayReport::default();

        for channel in &self.channels {
            let outcome = channel.attempt(&self.destination, message).await;
            let success = outcome.is_success();
            report.attempts.push(ChannelAttempt {
                channel: channel.name(),
                outcome,
            });
            if success {
                break;
            }
        }

        report
    }
}

/// Turkish lead summary sent to the sales WhatsApp line.
pub fn format_whatsapp_message(lead: &LeadRecord) -> String {
    const NOT_GIVEN: &str = "Belirtilmedi";
    let evet_hayir = |flag: bool| if flag { "Evet" } else { "Hayır" };
    let utm = lead.utm();

    // Istanbul has been on a fixed UTC+3 offset since 2016
    let submitted = lead.created_at().naive_utc() + ChronoDuration::hours(3);

    let header = if lead.is_callback() {
        "📞 *GERİ ARAMA TALEBİ* - Beylerbeyi Boğaz Rezidansları"
    } else {
        "🏠 *YENİ MÜŞTERİ ADAYI* - Beylerbeyi Boğaz Rezidansları"
    };

    let mut msg = String::new();
    msg.push_str(header);
    msg.push_str("\n\n");
    msg.push_str(&format!("👤 *İsim:* {}\n", lead.name()));
    msg.push_str(&format!("📞 *Telefon:* {}\n", lead.phone()));
    msg.push_str(&format!("📧 *E-posta:* {}\n", lead.email().unwrap_or(NOT_GIVEN)));
    msg.push_str(&format!("🌐 *Dil:* {}\n", lead.language().code().to_uppercase()));
    msg.push_str(&format!(
        "🏢 *İlgilenilen Daire:* {}\n",
        lead.unit_interest().unwrap_or(NOT_GIVEN)
    ));
    msg.push_str(&format!("💰 *Bütçe:* {}\n", lead.budget_range().unwrap_or(NOT_GIVEN)));
    msg.push_str(&format!("📅 *Zaman Planı:* {}\n", lead.timeline().unwrap_or(NOT_GIVEN)));
    msg.push_str(&format!(
        "⏰ *Aranma Saati:* {}\n",
        lead.best_call_time().unwrap_or(NOT_GIVEN)
    ));
    msg.push_str(&format!("💬 *WhatsApp İzni:* {}\n", evet_hayir(lead.whatsapp_optin())));
    msg.push_str(&format!(
        "📢 *Pazarlama İzni:* {}\n",
        evet_hayir(lead.marketing_consent())
    ));
    msg.push_str(&format!("✅ *KVKK Onayı:* {}\n", evet_hayir(lead.kvkk_consent())));

    msg.push_str("\n📊 *Kaynak Bilgileri:*\n");
    msg.push_str(&format!("   • Kaynak: {}\n", utm.source.as_deref().unwrap_or("Direkt")));
    msg.push_str(&format!("   • Ortam: {}\n", utm.medium.as_deref().unwrap_or("Yok")));
    msg.push_str(&format!("   • Kampanya: {}\n", utm.campaign.as_deref().unwrap_or("Yok")));
    msg.push_str(&format!("   • İçerik: {}\n", utm.content.as_deref().unwrap_or("Yok")));
    msg.push_str(&format!("   • Terim: {}\n", utm.term.as_deref().unwrap_or("Yok")));

    msg.push_str(&format!("\n🕐 *Tarih:* {}\n", submitted.format("%Y-%m-%d %H:%M:%S")));
    if let Some(ip) = lead.ip_address() {
        msg.push_str(&format!("🌍 *IP:* {}\n", ip));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallbackSubmission, ClientInfo};

    struct FixedChannel(&'static str, ChannelOutcome);

    #[async_trait]
    impl RelayChannel for FixedChannel {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn attempt(&self, _destination: &str, _message: &str) -> ChannelOutcome {
            self.1.clone()
        }
    }

    #[test]
    fn test_manual_link_encoding() {
        let link = build_manual_link("+905525242866", "Yeni lead: Ayşe & Co?");
        assert_eq!(
            link,
            "https://wa.me/905525242866?text=Yeni%20lead%3A%20Ay%C5%9Fe%20%26%20Co%3F"
        );
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_success() {
        let chain = WhatsAppRelayChain::new(
            "+905525242866",
            vec![
                Box::new(FixedChannel("first", ChannelOutcome::Failed("HTTP 500".to_string()))),
                Box::new(FixedChannel("second", ChannelOutcome::Sent)),
            ],
        );

        let report = chain.deliver("hello").await;

        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.delivered_by(), Some("second"));
        assert!(report.manual_link().is_none());
    }

    #[tokio::test]
    async fn test_chain_ends_with_manual_link() {
        let chain = WhatsAppRelayChain::new(
            "+905525242866",
            vec![Box::new(FixedChannel(
                "first",
                ChannelOutcome::Skipped("no key".to_string()),
            ))],
        );

        assert_eq!(chain.channel_names(), vec!["first", "manual_link"]);

        let report = chain.deliver("hello").await;
        assert_eq!(report.delivered_by(), Some("manual_link"));
        assert_eq!(report.manual_link(), Some("https://wa.me/905525242866?text=hello"));
    }

    #[test]
    fn test_callback_message_header() {
        let form = CallbackSubmission {
            callback_name: "Mehmet".to_string(),
            callback_phone: "05551234567".to_string(),
            language: None,
        };
        let lead = LeadRecord::from_callback(&form, ClientInfo::default()).unwrap();
        let msg = format_whatsapp_message(&lead);

        assert!(msg.starts_with("📞 *GERİ ARAMA TALEBİ*"));
        assert!(msg.contains("*E-posta:* Belirtilmedi"));
        assert!(msg.contains("*KVKK Onayı:* Evet"));
        assert!(msg.contains("Kaynak: Direkt"));
        assert!(!msg.contains("*IP:*"));
    }
}
