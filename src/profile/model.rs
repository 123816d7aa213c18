//! Business profile data models.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Company headcount bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Startup,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-1000")]
    Large,
    #[serde(rename = "1000+")]
    Enterprise,
}

impl CompanySize {
    pub const ALL: [CompanySize; 5] = [
        Self::Startup,
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::Enterprise,
    ];

    /// Wire label, e.g. `"11-50"`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Startup => "1-10",
            Self::Small => "11-50",
            Self::Medium => "51-200",
            Self::Large => "201-1000",
            Self::Enterprise => "1000+",
        }
    }

    /// Human description shown next to the label on the form.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Startup => "1-10 employees (Startup)",
            Self::Small => "11-50 employees (Small)",
            Self::Medium => "51-200 employees (Medium)",
            Self::Large => "201-1000 employees (Large)",
            Self::Enterprise => "1000+ employees (Enterprise)",
        }
    }
}

impl std::fmt::Display for CompanySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CompanySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.label() == s.trim())
            .ok_or_else(|| format!("unknown company size: {s}"))
    }
}

/// A validated business profile.
///
/// Stored in the `settings` table as JSON under key `"business_profile"`
/// and as a row in `business_profiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub full_name: String,
    pub company_name: String,
    pub company_email: String,
    pub contact_number: String,
    pub job_title: String,
    pub company_size: CompanySize,
    pub industry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_description: Option<String>,
}

impl BusinessProfile {
    /// Render the profile as the "Client Business Profile" block of the
    /// consultant system prompt.
    pub fn to_system_prompt_section(&self) -> String {
        let description = self
            .business_description
            .as_deref()
            .unwrap_or("Not provided");
        [
            "Client Business Profile:".to_string(),
            format!("- Name: {}", self.full_name),
            format!("- Company: {}", self.company_name),
            format!("- Industry: {}", self.industry),
            format!("- Company Size: {}", self.company_size),
            format!("- Job Title: {}", self.job_title),
            format!("- Business Description: {description}"),
            format!("- Contact: {}", self.company_email),
        ]
        .join("\n")
    }
}

/// Raw form input, before validation. Every field is free text so a bad
/// company size is reported as a field error rather than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileDraft {
    pub full_name: String,
    pub company_name: String,
    pub company_email: String,
    pub contact_number: String,
    pub job_title: String,
    pub company_size: String,
    pub industry: String,
    pub business_description: String,
}

impl From<&BusinessProfile> for ProfileDraft {
    fn from(profile: &BusinessProfile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            company_name: profile.company_name.clone(),
            company_email: profile.company_email.clone(),
            contact_number: profile.contact_number.clone(),
            job_title: profile.job_title.clone(),
            company_size: profile.company_size.label().to_string(),
            industry: profile.industry.clone(),
            business_description: profile.business_description.clone().unwrap_or_default(),
        }
    }
}

/// Settings keys used for profile persistence.
pub mod settings_keys {
    /// Key for the BusinessProfile JSON blob in the settings table.
    pub const BUSINESS_PROFILE: &str = "business_profile";
}

#[cfg(test)]
pub(crate) fn sample_profile() -> BusinessProfile {
    BusinessProfile {
        full_name: "Dana Reyes".to_string(),
        company_name: "Acme Coffee Roasters".to_string(),
        company_email: "dana@acmecoffee.com".to_string(),
        contact_number: "+1 (555) 010-2020".to_string(),
        job_title: "Marketing Director".to_string(),
        company_size: CompanySize::Small,
        industry: "Food & Beverage".to_string(),
        business_description: Some("Specialty coffee roasting and wholesale".to_string()),
    }
}
