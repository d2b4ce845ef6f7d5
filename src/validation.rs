/// Syntactic validation of lead contact fields
///
/// Everything here is pure: no DNS/MX lookups, no carrier checks. The empty-string
/// rules differ per field (email is optional, phone is required) and callers rely
/// on that to decide whether to short-circuit.
use crate::models::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of an email address (RFC 3696 errata).
const MAX_EMAIL_LEN: usize = 320;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Turkish mobile/landline conventions, checked against the cleaned digit string.
///
/// `\d` is Unicode-aware, so Arabic-Indic digits typed on the Arabic page match too.
static TR_PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^90\d{10}$", // +90 555 123 45 67
        r"^0\d{10}$",  // 0555 123 45 67
        r"^5\d{9}$",   // 555 123 45 67
        r"^\d{10}$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid phone regex"))
    .collect()
});

/// Loose international acceptance: any 10 to 15 decimal digits.
static LOOSE_PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{10,15}$").expect("valid phone regex"));

/// Validate an email address.
///
/// An empty (or whitespace-only) address is valid because the field is optional.
/// Otherwise the address must look like `local@domain.tld`, be at most 320
/// characters, and contain no consecutive, leading or trailing dots.
pub fn validate_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() {
        return true;
    }

    if !EMAIL_REGEX.is_match(email) {
        tracing::debug!("❌ Email does not match pattern: {}", email);
        return false;
    }

    if email.len() > MAX_EMAIL_LEN {
        return false;
    }

    if email.contains("..") {
        return false;
    }

    !(email.starts_with('.') || email.ends_with('.'))
}

/// Strip the separators people type into phone fields.
pub fn clean_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '-' | '(' | ')' | '+' | '.')))
        .collect()
}

/// Validate a phone number.
///
/// Empty is invalid (the field is required). After stripping whitespace,
/// hyphens, parentheses, plus signs and dots the digits must match one of the
/// Turkish patterns, or be any purely numeric string of 10 to 15 digits. Any
/// Unicode decimal digit counts.
pub fn validate_phone(phone: &str) -> bool {
    let phone = phone.trim();
    if phone.is_empty() {
        return false;
    }

    let cleaned = clean_phone(phone);

    if TR_PHONE_PATTERNS.iter().any(|re| re.is_match(&cleaned)) {
        return true;
    }

    LOOSE_PHONE_PATTERN.is_match(&cleaned)
}

/// The validation failures a submission can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    InvalidEmail,
    InvalidPhone,
    RequiredPhone,
    RequiredName,
    RequiredKvkk,
}

impl ValidationErrorKind {
    /// Message-table key for this failure.
    pub fn key(&self) -> &'static str {
        match self {
            ValidationErrorKind::InvalidEmail => "invalid_email",
            ValidationErrorKind::InvalidPhone => "invalid_phone",
            ValidationErrorKind::RequiredPhone => "required_phone",
            ValidationErrorKind::RequiredName => "required_name",
            ValidationErrorKind::RequiredKvkk => "required_kvkk",
        }
    }

    /// Form field the failure refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationErrorKind::InvalidEmail => "email",
            ValidationErrorKind::InvalidPhone | ValidationErrorKind::RequiredPhone => "phone",
            ValidationErrorKind::RequiredName => "name",
            ValidationErrorKind::RequiredKvkk => "kvkk_consent",
        }
    }

    pub fn message(&self, language: Language) -> &'static str {
        error_message(self.key(), language.code())
    }
}

/// Localized validation message lookup.
///
/// Unknown languages fall back to Turkish; unknown keys return a generic
/// "Validation error".
pub fn error_message(field: &str, lang: &str) -> &'static str {
    let table: &[(&str, &'static str)] = match lang {
        "en" => &[
            ("invalid_email", "Invalid email address format"),
            (
                "invalid_phone",
                "Invalid phone number format. Please enter a valid Turkish phone number (e.g., 0555 123 45 67)",
            ),
            ("required_phone", "Phone number is required"),
            ("required_name", "Name is required"),
            ("required_kvkk", "KVKK consent is required"),
        ],
        "ar" => &[
            ("invalid_email", "تنسيق عنوان البريد الإلكتروني غير صحيح"),
            (
                "invalid_phone",
                "تنسيق رقم الهاتف غير صحيح. يرجى إدخال رقم هاتف تركي صحيح",
            ),
            ("required_phone", "رقم الهاتف مطلوب"),
            ("required_name", "الاسم مطلوب"),
            ("required_kvkk", "موافقة KVKK مطلوبة"),
        ],
        _ => &[
            ("invalid_email", "Geçersiz e-posta adresi formatı"),
            (
                "invalid_phone",
                "Geçersiz telefon numarası formatı. Lütfen Türk telefon numarası formatında giriniz (örn: 0555 123 45 67)",
            ),
            ("required_phone", "Telefon numarası gereklidir"),
            ("required_name", "İsim gereklidir"),
            ("required_kvkk", "KVKK onayı gereklidir"),
        ],
    };

    table
        .iter()
        .find(|(key, _)| *key == field)
        .map(|(_, message)| *message)
        .unwrap_or("Validation error")
}
