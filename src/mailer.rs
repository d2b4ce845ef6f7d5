//! Email notifications: the internal "new lead" message to the sales mailbox and
//! the localized auto-reply to the lead.

use crate::config::MailSettings;
use crate::errors::AppError;
use crate::models::LeadRecord;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Display name used in subjects and signatures.
pub const PROJECT_NAME: &str = "Beylerbeyi Residences";

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can deliver a plain-text email.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// SMTP transport backed by lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Builds the transport from settings. Returns `Ok(None)` when no sender is configured.
    pub fn from_settings(settings: &MailSettings) -> Result<Option<Self>, AppError> {
        let Some(sender) = settings.sender() else {
            return Ok(None);
        };
        let sender: Mailbox = sender.parse()?;

        let mut builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.server)
        };
        builder = builder.port(settings.port).timeout(Some(SMTP_TIMEOUT));

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Some(Self {
            transport: builder.build(),
            sender,
        }))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient.parse::<Mailbox>()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Sales notification subject and body for a lead.
pub fn format_sales_notification(lead: &LeadRecord) -> (String, String) {
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
    let utm = lead.utm();

    let subject = format!("New Lead: {} - {}", lead.name(), PROJECT_NAME);
    let body = format!(
        "New lead received for Beylerbeyi Bosphorus Residences:\n\
         \n\
         Name: {name}\n\
         Phone: {phone}\n\
         Email: {email}\n\
         Language: {language}\n\
         Unit Interest: {unit}\n\
         Budget Range: {budget}\n\
         Timeline: {timeline}\n\
         Best Call Time: {call_time}\n\
         WhatsApp Opt-in: {whatsapp}\n\
         Marketing Consent: {marketing}\n\
         KVKK Consent: {kvkk}\n\
         \n\
         UTM Data:\n\
         Source: {source}\n\
         Medium: {medium}\n\
         Campaign: {campaign}\n\
         Content: {content}\n\
         Term: {term}\n\
         \n\
         Submitted: {submitted}\n\
         IP: {ip}\n\
         User Agent: {agent}\n\
         Reference: {reference}\n",
        name = lead.name(),
        phone = lead.phone(),
        email = lead.email().unwrap_or("Not provided"),
        language = lead.language(),
        unit = lead.unit_interest().unwrap_or("Not specified"),
        budget = lead.budget_range().unwrap_or("Not specified"),
        timeline = lead.timeline().unwrap_or("Not specified"),
        call_time = lead.best_call_time().unwrap_or("Not specified"),
        whatsapp = yes_no(lead.whatsapp_optin()),
        marketing = yes_no(lead.marketing_consent()),
        kvkk = yes_no(lead.kvkk_consent()),
        source = utm.source.as_deref().unwrap_or("Direct"),
        medium = utm.medium.as_deref().unwrap_or("None"),
        campaign = utm.campaign.as_deref().unwrap_or("None"),
        content = utm.content.as_deref().unwrap_or("None"),
        term = utm.term.as_deref().unwrap_or("None"),
        submitted = lead.created_at().format("%Y-%m-%d %H:%M:%S UTC"),
        ip = lead.ip_address().unwrap_or("Unknown"),
        agent = lead.user_agent().unwrap_or("Unknown"),
        reference = lead.reference(),
    );

    (subject, body)
}

/// Localized auto-reply copy.
#[derive(Debug, PartialEq, Eq)]
pub struct AutoReplyTemplate {
    pub subject: &'static str,
    greeting: &'static str,
    message: &'static str,
    signature: &'static str,
}

const AUTO_REPLY_TR: AutoReplyTemplate = AutoReplyTemplate {
    subject: "Beylerbeyi Boğaz Rezidansları - Bilgileriniz Alındı",
    greeting: "Sayın {name},",
    message: "Beylerbeyi Boğaz Rezidansları ile ilgili gösterdiğiniz ilgi için teşekkür ederiz. Uzmanlarımız en kısa sürede sizinle iletişime geçecektir.",
    signature: "Beylerbeyi Boğaz Rezidansları Satış Ekibi",
};

const AUTO_REPLY_EN: AutoReplyTemplate = AutoReplyTemplate {
    subject: "Beylerbeyi Bosphorus Residences - Information Received",
    greeting: "Dear {name},",
    message: "Thank you for your interest in Beylerbeyi Bosphorus Residences. Our specialists will contact you shortly.",
    signature: "Beylerbeyi Bosphorus Residences Sales Team",
};

const AUTO_REPLY_AR: AutoReplyTemplate = AutoReplyTemplate {
    subject: "مساكن بوسفور بييلربيي - تم استلام معلوماتك",
    greeting: "عزيزي {name}،",
    message: "شكراً لك على اهتمامك بمساكن بوسفور بييلربيي. سيتواصل معك فريق الخبراء لدينا قريباً.",
    signature: "فريق مبيعات مساكن بوسفور بييلربيي",
};

impl AutoReplyTemplate {
    /// Template for a language code; unrecognized codes get English.
    pub fn for_code(code: &str) -> &'static AutoReplyTemplate {
        match code {
            "tr" => &AUTO_REPLY_TR,
            "ar" => &AUTO_REPLY_AR,
            _ => &AUTO_REPLY_EN,
        }
    }

    pub fn render(&self, name: &str) -> String {
        format!(
            "{}\n\n{}\n\n{}\n",
            self.greeting.replace("{name}", name),
            self.message,
            self.signature
        )
    }
}

/// What happened to the auto-reply for one lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoReplyStatus {
    Sent,
    /// The lead left no email address.
    Skipped,
    Failed,
}

/// Result of the email half of a dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct EmailReport {
    pub sales_notified: bool,
    pub auto_reply: AutoReplyStatus,
}

/// Sends both lead emails through an injected transport.
#[derive(Clone)]
pub struct EmailNotifier {
    transport: Arc<dyn MailTransport>,
    sales_email: String,
}

impl EmailNotifier {
    pub fn new(transport: Arc<dyn MailTransport>, sales_email: impl Into<String>) -> Self {
        Self {
            transport,
            sales_email: sales_email.into(),
        }
    }

    /// Internal "new lead" message. Failures are logged and reported as `false`.
    pub async fn send_lead_notification(&self, lead: &LeadRecord) -> bool {
        let (subject, body) = format_sales_notification(lead);

        match self.transport.send(&self.sales_email, &subject, &body).await {
            Ok(()) => {
                tracing::info!(
                    "📧 Lead notification sent to {} (lead {})",
                    self.sales_email,
                    lead.reference()
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    "Error sending lead notification for {}: {}",
                    lead.reference(),
                    e
                );
                false
            }
        }
    }

    /// Localized auto-reply to the lead. Skipped without touching the transport
    /// when the lead has no email.
    pub async fn send_auto_reply(&self, lead: &LeadRecord) -> AutoReplyStatus {
        let Some(recipient) = lead.email() else {
            tracing::debug!("No email for lead {}, auto-reply skipped", lead.reference());
            return AutoReplyStatus::Skipped;
        };

        let template = AutoReplyTemplate::for_code(lead.requested_language());
        let body = template.render(lead.name());

        match self.transport.send(recipient, template.subject, &body).await {
            Ok(()) => {
                tracing::info!("📧 Auto-reply sent to {}", recipient);
                AutoReplyStatus::Sent
            }
            Err(e) => {
                tracing::error!("Error sending auto-reply to {}: {}", recipient, e);
                AutoReplyStatus::Failed
            }
        }
    }

    /// Runs both sends independently; neither failure blocks the other.
    pub async fn notify(&self, lead: &LeadRecord) -> EmailReport {
        let sales_notified = self.send_lead_notification(lead).await;
        let auto_reply = self.send_auto_reply(lead).await;

        EmailReport {
            sales_notified,
            auto_reply,
        }
    }
}
