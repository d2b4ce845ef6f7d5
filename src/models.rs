use crate::validation::{validate_email, validate_phone, ValidationErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// `unit_interest` value marking a quick callback request.
pub const CALLBACK_UNIT_INTEREST: &str = "callback_request";

/// Languages the landing page is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Tr,
    En,
    Ar,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Tr, Language::En, Language::Ar];

    /// Parse a language code, returning `None` for unsupported codes.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "tr" => Some(Language::Tr),
            "en" => Some(Language::En),
            "ar" => Some(Language::Ar),
            _ => None,
        }
    }

    /// Parse a language code, normalizing anything unsupported to Turkish.
    pub fn from_code_or_default(code: Option<&str>) -> Self {
        code.and_then(Self::parse).unwrap_or_default()
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Tr => "tr",
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raw lead form as posted by the landing page.
///
/// Checkbox fields carry `"on"` when ticked and are absent otherwise.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub language: Option<String>,
    pub unit_interest: Option<String>,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,
    pub best_call_time: Option<String>,
    pub whatsapp_optin: Option<String>,
    pub marketing_consent: Option<String>,
    pub kvkk_consent: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
}

impl LeadSubmission {
    pub fn language(&self) -> Language {
        Language::from_code_or_default(self.language.as_deref())
    }
}

/// Quick callback form (name + phone only).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackSubmission {
    #[serde(default)]
    pub callback_name: String,
    #[serde(default)]
    pub callback_phone: String,
    pub language: Option<String>,
}

impl CallbackSubmission {
    pub fn language(&self) -> Language {
        Language::from_code_or_default(self.language.as_deref())
    }
}

/// Request metadata captured alongside a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Marketing campaign attribution carried through from the originating link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UtmAttribution {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub content: Option<String>,
    pub term: Option<String>,
}

/// One validated lead submission.
///
/// Fields are private: a `LeadRecord` can only be built through the
/// validating constructors and is never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct LeadRecord {
    reference: Uuid,
    name: String,
    phone: String,
    email: Option<String>,
    language: Language,
    /// Code as submitted (lowercased), kept so the auto-reply can tell an
    /// unsupported language apart from an explicit `tr`.
    requested_language: Option<String>,
    unit_interest: Option<String>,
    budget_range: Option<String>,
    timeline: Option<String>,
    best_call_time: Option<String>,
    whatsapp_optin: bool,
    marketing_consent: bool,
    kvkk_consent: bool,
    utm: UtmAttribution,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

/// Trim a form value and drop it when empty.
fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn requested_code(value: Option<&str>) -> Option<String> {
    non_empty(value).map(|code| code.to_lowercase())
}

fn checkbox(value: Option<&str>) -> bool {
    value.map(str::trim) == Some("on")
}

/// Shared contact-field checks, in the order failures are reported.
fn check_contact(name: &str, phone: &str, email: Option<&str>) -> Result<(), ValidationErrorKind> {
    if name.is_empty() {
        return Err(ValidationErrorKind::RequiredName);
    }
    if phone.is_empty() {
        return Err(ValidationErrorKind::RequiredPhone);
    }
    if !validate_phone(phone) {
        return Err(ValidationErrorKind::InvalidPhone);
    }
    if let Some(email) = email {
        if !validate_email(email) {
            return Err(ValidationErrorKind::InvalidEmail);
        }
    }
    Ok(())
}

impl LeadRecord {
    /// Build a lead from the full landing-page form.
    pub fn from_submission(
        form: &LeadSubmission,
        client: ClientInfo,
    ) -> Result<Self, ValidationErrorKind> {
        let name = form.name.trim().to_string();
        let phone = form.phone.trim().to_string();
        let email = non_empty(Some(form.email.as_str()));

        check_contact(&name, &phone, email.as_deref())?;

        if !checkbox(form.kvkk_consent.as_deref()) {
            return Err(ValidationErrorKind::RequiredKvkk);
        }

        Ok(Self {
            reference: Uuid::new_v4(),
            name,
            phone,
            email,
            language: form.language(),
            requested_language: requested_code(form.language.as_deref()),
            unit_interest: non_empty(form.unit_interest.as_deref()),
            budget_range: non_empty(form.budget_range.as_deref()),
            timeline: non_empty(form.timeline.as_deref()),
            best_call_time: non_empty(form.best_call_time.as_deref()),
            whatsapp_optin: checkbox(form.whatsapp_optin.as_deref()),
            marketing_consent: checkbox(form.marketing_consent.as_deref()),
            kvkk_consent: true,
            utm: UtmAttribution {
                source: non_empty(form.utm_source.as_deref()),
                medium: non_empty(form.utm_medium.as_deref()),
                campaign: non_empty(form.utm_campaign.as_deref()),
                content: non_empty(form.utm_content.as_deref()),
                term: non_empty(form.utm_term.as_deref()),
            },
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            created_at: Utc::now(),
        })
    }

    /// Build a lead from the quick callback form. KVKK consent is implied.
    pub fn from_callback(
        form: &CallbackSubmission,
        client: ClientInfo,
    ) -> Result<Self, ValidationErrorKind> {
        let name = form.callback_name.trim().to_string();
        let phone = form.callback_phone.trim().to_string();

        check_contact(&name, &phone, None)?;

        Ok(Self {
            reference: Uuid::new_v4(),
            name,
            phone,
            email: None,
            language: form.language(),
            requested_language: requested_code(form.language.as_deref()),
            unit_interest: Some(CALLBACK_UNIT_INTEREST.to_string()),
            budget_range: None,
            timeline: None,
            best_call_time: None,
            whatsapp_optin: false,
            marketing_consent: false,
            kvkk_consent: true,
            utm: UtmAttribution::default(),
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            created_at: Utc::now(),
        })
    }

    /// Correlation id used in logs and stored with the lead.
    pub fn reference(&self) -> Uuid {
        self.reference
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// The language code as submitted, or the normalized code when none was sent.
    pub fn requested_language(&self) -> &str {
        self.requested_language
            .as_deref()
            .unwrap_or(self.language.code())
    }

    pub fn unit_interest(&self) -> Option<&str> {
        self.unit_interest.as_deref()
    }

    pub fn budget_range(&self) -> Option<&str> {
        self.budget_range.as_deref()
    }

    pub fn timeline(&self) -> Option<&str> {
        self.timeline.as_deref()
    }

    pub fn best_call_time(&self) -> Option<&str> {
        self.best_call_time.as_deref()
    }

    pub fn whatsapp_optin(&self) -> bool {
        self.whatsapp_optin
    }

    pub fn marketing_consent(&self) -> bool {
        self.marketing_consent
    }

    pub fn kvkk_consent(&self) -> bool {
        self.kvkk_consent
    }

    pub fn utm(&self) -> &UtmAttribution {
        &self.utm
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_callback(&self) -> bool {
        self.unit_interest.as_deref() == Some(CALLBACK_UNIT_INTEREST)
    }
}

/// JSON body returned by the form endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> LeadSubmission {
        LeadSubmission {
            name: "  Ayşe Yılmaz ".to_string(),
            phone: "0555 123 45 67".to_string(),
            email: "ayse@example.com".to_string(),
            language: Some("en".to_string()),
            kvkk_consent: Some("on".to_string()),
            whatsapp_optin: Some("on".to_string()),
            utm_source: Some("google".to_string()),
            utm_medium: Some("".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("TR"), Some(Language::Tr));
        assert_eq!(Language::parse("de"), None);
        assert_eq!(Language::from_code_or_default(Some("de")), Language::Tr);
        assert_eq!(Language::from_code_or_default(None), Language::Tr);
    }

    #[test]
    fn test_from_submission_normalizes_fields() {
        let lead = LeadRecord::from_submission(&valid_form(), ClientInfo::default()).unwrap();

        assert_eq!(lead.name(), "Ayşe Yılmaz");
        assert_eq!(lead.phone(), "0555 123 45 67");
        assert_eq!(lead.language(), Language::En);
        assert!(lead.whatsapp_optin());
        assert!(!lead.marketing_consent());
        assert!(lead.kvkk_consent());
        assert_eq!(lead.utm().source.as_deref(), Some("google"));
        assert_eq!(lead.utm().medium, None);
    }

    #[test]
    fn test_validation_order() {
        let mut form = valid_form();
        form.name = " ".to_string();
        form.phone = String::new();
        assert_eq!(
            LeadRecord::from_submission(&form, ClientInfo::default()).unwrap_err(),
            ValidationErrorKind::RequiredName
        );

        let mut form = valid_form();
        form.phone = "123".to_string();
        form.email = "broken".to_string();
        assert_eq!(
            LeadRecord::from_submission(&form, ClientInfo::default()).unwrap_err(),
            ValidationErrorKind::InvalidPhone
        );

        let mut form = valid_form();
        form.email = "broken".to_string();
        form.kvkk_consent = None;
        assert_eq!(
            LeadRecord::from_submission(&form, ClientInfo::default()).unwrap_err(),
            ValidationErrorKind::InvalidEmail
        );
    }

    #[test]
    fn test_kvkk_required() {
        let mut form = valid_form();
        form.kvkk_consent = Some("off".to_string());
        assert_eq!(
            LeadRecord::from_submission(&form, ClientInfo::default()).unwrap_err(),
            ValidationErrorKind::RequiredKvkk
        );
    }

    #[test]
    fn test_empty_email_is_absent() {
        let mut form = valid_form();
        form.email = "   ".to_string();
        let lead = LeadRecord::from_submission(&form, ClientInfo::default()).unwrap();
        assert_eq!(lead.email(), None);
    }

    #[test]
    fn test_callback_record() {
        let form = CallbackSubmission {
            callback_name: "Mehmet".to_string(),
            callback_phone: "+90 555 123 45 67".to_string(),
            language: Some("ar".to_string()),
        };
        let client = ClientInfo {
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: None,
        };
        let lead = LeadRecord::from_callback(&form, client).unwrap();

        assert!(lead.is_callback());
        assert!(lead.kvkk_consent());
        assert_eq!(lead.email(), None);
        assert_eq!(lead.language(), Language::Ar);
        assert_eq!(lead.ip_address(), Some("10.0.0.1"));
    }

    #[test]
    fn test_requested_language_kept_for_unsupported_code() {
        let mut form = valid_form();
        form.language = Some(" DE ".to_string());
        let lead = LeadRecord::from_submission(&form, ClientInfo::default()).unwrap();
        assert_eq!(lead.language(), Language::Tr);
        assert_eq!(lead.requested_language(), "de");

        form.language = None;
        let lead = LeadRecord::from_submission(&form, ClientInfo::default()).unwrap();
        assert_eq!(lead.requested_language(), "tr");
    }
}
