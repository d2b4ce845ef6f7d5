/// Lead notification dispatch
///
/// Runs the email notifications (when a mail transport is configured) and the
/// WhatsApp relay chain for one lead. Nothing here returns an error: every
/// channel failure is logged and reported, and the caller always gets a report.
use crate::mailer::{EmailNotifier, EmailReport};
use crate::models::LeadRecord;
use crate::whatsapp::{format_whatsapp_message, RelayReport, WhatsAppRelayChain};
use serde::Serialize;
use uuid::Uuid;

/// Everything that happened while notifying about one lead.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub reference: Uuid,
    /// `None` when email is not configured.
    pub email: Option<EmailReport>,
    pub whatsapp: RelayReport,
}

impl DispatchReport {
    /// True when any channel succeeded or a manual link was produced.
    pub fn delivered(&self) -> bool {
        self.whatsapp.is_delivered()
            || self
                .email
                .as_ref()
                .map(|e| e.sales_notified)
                .unwrap_or(false)
    }

    pub fn manual_link(&self) -> Option<&str> {
        self.whatsapp.manual_link()
    }
}

pub struct NotificationDispatcher {
    email: Option<EmailNotifier>,
    whatsapp: WhatsAppRelayChain,
}

impl NotificationDispatcher {
    pub fn new(email: Option<EmailNotifier>, whatsapp: WhatsAppRelayChain) -> Self {
        Self { email, whatsapp }
    }

    pub fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    pub fn whatsapp(&self) -> &WhatsAppRelayChain {
        &self.whatsapp
    }

    /// Notify the sales team about a lead through every configured channel.
    pub async fn dispatch(&self, lead: &LeadRecord) -> DispatchReport {
        tracing::info!(
            "📨 Dispatching notifications for lead {} ({})",
            lead.reference(),
            lead.name()
        );

        let email = match &self.email {
            Some(notifier) => Some(notifier.notify(lead).await),
            None => {
                tracing::debug!("Email not configured, skipping email notifications");
                None
            }
        };

        let whatsapp = self.dispatch_whatsapp(lead).await;

        let report = DispatchReport {
            reference: lead.reference(),
            email,
            whatsapp,
        };

        tracing::info!(
            "Dispatch complete for lead {}: delivered={}, whatsapp_channel={:?}",
            report.reference,
            report.delivered(),
            report.whatsapp.delivered_by()
        );

        report
    }

    /// Only the WhatsApp relay chain.
    pub async fn dispatch_whatsapp(&self, lead: &LeadRecord) -> RelayReport {
        let message = format_whatsapp_message(lead);
        self.whatsapp.deliver(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::AutoReplyStatus;
    use crate::whatsapp::{ChannelAttempt, ChannelOutcome};

    fn report(email: Option<EmailReport>, attempts: Vec<ChannelAttempt>) -> DispatchReport {
        DispatchReport {
            reference: Uuid::new_v4(),
            email,
            whatsapp: RelayReport { attempts },
        }
    }

    #[test]
    fn test_delivered_by_email_alone() {
        let r = report(
            Some(EmailReport {
                sales_notified: true,
                auto_reply: AutoReplyStatus::Skipped,
            }),
            vec![],
        );
        assert!(r.delivered());
    }

    #[test]
    fn test_not_delivered_when_everything_failed() {
        let r = report(
            Some(EmailReport {
                sales_notified: false,
                auto_reply: AutoReplyStatus::Failed,
            }),
            vec![ChannelAttempt {
                channel: "callmebot",
                outcome: ChannelOutcome::Failed("HTTP 500".to_string()),
            }],
        );
        assert!(!r.delivered());
    }
}
