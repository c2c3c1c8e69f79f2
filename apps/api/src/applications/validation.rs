use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::errors::FieldErrors;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Applicant-entered fields, shared by submit and edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub experience: String,
    #[serde(default)]
    pub cover_letter: String,
    pub resume_url: String,
}

/// Checks every field and collects all failures.
///
/// - name, experience: non-empty after trimming
/// - email: `local@domain.tld`
/// - phone: digits, ignoring spaces, dashes, parentheses and a leading `+`
/// - resume_url: absolute http(s) URL with a host
///
/// Content is not sanitized beyond these checks.
pub fn validate_application(form: &ApplicationForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if form.name.trim().is_empty() {
        errors.insert("name".into(), "Name is required".into());
    }
    if !is_valid_email(&form.email) {
        errors.insert("email".into(), "Enter a valid email address".into());
    }
    if !is_valid_phone(&form.phone) {
        errors.insert("phone".into(), "Phone number must contain only digits".into());
    }
    if form.experience.trim().is_empty() {
        errors.insert("experience".into(), "Experience is required".into());
    }
    if !is_valid_resume_url(&form.resume_url) {
        errors.insert(
            "resumeUrl".into(),
            "Resume link must be a valid http(s) URL".into(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email.trim())
}

pub fn is_valid_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_resume_url(link: &str) -> bool {
    match Url::parse(link.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> ApplicationForm {
        ApplicationForm {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+1 (555) 010-2030".into(),
            experience: "5 years of analytical engines".into(),
            cover_letter: String::new(),
            resume_url: "https://files.example.com/ada.pdf".into(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(validate_application(&valid_form()).is_ok());
    }

    #[test]
    fn test_invalid_resume_url() {
        let mut form = valid_form();
        form.resume_url = "not a url".into();
        let errors = validate_application(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("resumeUrl"));
    }

    #[test]
    fn test_resume_url_requires_http_scheme() {
        assert!(!is_valid_resume_url("ftp://files.example.com/cv.pdf"));
        assert!(!is_valid_resume_url("mailto:ada@example.com"));
        assert!(is_valid_resume_url("http://example.com/cv"));
    }

    #[test]
    fn test_collects_all_errors() {
        let form = ApplicationForm {
            name: "  ".into(),
            email: "nope".into(),
            phone: "call me".into(),
            experience: String::new(),
            cover_letter: String::new(),
            resume_url: String::new(),
        };
        let errors = validate_application(&form).unwrap_err();
        for field in ["name", "email", "phone", "experience", "resumeUrl"] {
            assert!(errors.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email("@c.de"));
    }

    #[test]
    fn test_phone_formats() {
        assert!(is_valid_phone("5550102030"));
        assert!(is_valid_phone("+44 20 7946 0958"));
        assert!(!is_valid_phone("555-CALL-NOW"));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone(""));
    }
}
