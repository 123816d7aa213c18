//! Field validation for the business profile form.

use std::sync::LazyLock;

use regex::Regex;

use super::model::{BusinessProfile, CompanySize, ProfileDraft};
use crate::error::FieldErrors;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").expect("valid phone regex"));

static PHONE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-()]").expect("valid separator regex"));

/// Whether `email` looks like `local@domain.tld`.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Whether `number` is a phone number: optional leading `+`, no leading
/// zero, up to 16 digits, with spaces, dashes and parentheses ignored.
pub fn is_valid_phone(number: &str) -> bool {
    let digits = PHONE_SEPARATORS.replace_all(number, "");
    PHONE_RE.is_match(&digits)
}

/// Validate a draft, collecting an error for every offending field.
///
/// Returns the trimmed, typed profile when everything passes.
pub fn validate(draft: &ProfileDraft) -> Result<BusinessProfile, FieldErrors> {
    let mut errors = FieldErrors::new();

    let mut required = |key: &'static str, value: &str, label: &str| {
        if value.trim().is_empty() {
            errors.insert(key, format!("{label} is required"));
            false
        } else {
            true
        }
    };

    required("fullName", &draft.full_name, "Full name");
    required("companyName", &draft.company_name, "Company name");
    let has_email = required("companyEmail", &draft.company_email, "Company email");
    let has_phone = required("contactNumber", &draft.contact_number, "Contact number");
    required("jobTitle", &draft.job_title, "Job title");
    let has_size = required("companySize", &draft.company_size, "Company size");
    required("industry", &draft.industry, "Industry");

    if has_email && !is_valid_email(draft.company_email.trim()) {
        errors.insert(
            "companyEmail",
            "Please enter a valid email address".to_string(),
        );
    }

    if has_phone && !is_valid_phone(draft.contact_number.trim()) {
        errors.insert(
            "contactNumber",
            "Please enter a valid phone number".to_string(),
        );
    }

    let company_size = if has_size {
        match draft.company_size.parse::<CompanySize>() {
            Ok(size) => Some(size),
            Err(_) => {
                errors.insert(
                    "companySize",
                    "Please select a valid company size".to_string(),
                );
                None
            }
        }
    } else {
        None
    };

    match company_size {
        Some(company_size) if errors.is_empty() => {
            let description = draft.business_description.trim();
            Ok(BusinessProfile {
                full_name: draft.full_name.trim().to_string(),
                company_name: draft.company_name.trim().to_string(),
                company_email: draft.company_email.trim().to_string(),
                contact_number: draft.contact_number.trim().to_string(),
                job_title: draft.job_title.trim().to_string(),
                company_size,
                industry: draft.industry.trim().to_string(),
                business_description: (!description.is_empty()).then(|| description.to_string()),
            })
        }
        _ => Err(errors),
    }
}
