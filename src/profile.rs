use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Applicant details used to populate application forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplicantProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub linkedin_url: String,
    pub github_url: String,
    pub willing_to_relocate: String,
    pub work_authorization: String,
    pub visa_sponsorship_required: String,
    pub salary_expectation: String,
    pub resume_path: Option<PathBuf>,
}

static NON_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z]").expect("valid regex"));

#[derive(Debug, Clone, Copy)]
enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    LinkedIn,
    GitHub,
}

// Alias lists are compared against the label with everything but letters
// stripped, so "first_name", "First Name" and "first-name" all match.
const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::FirstName, &["firstname", "givenname", "namefirst"]),
    (Field::LastName, &["lastname", "familyname", "surname", "namelast"]),
    (Field::Email, &["email", "emailaddress"]),
    (Field::Phone, &["phone", "telephone", "mobile", "phonenumber"]),
    (Field::LinkedIn, &["linkedin", "linkedinurl", "linkedinprofile"]),
    (Field::GitHub, &["github", "githuburl", "githubprofile"]),
];

// Too short to search for inside longer labels ("hotel", "fullname").
const EXACT_ALIASES: &[(Field, &str)] = &[
    (Field::FirstName, "fname"),
    (Field::LastName, "lname"),
    (Field::Phone, "tel"),
];

fn normalize_label(label: &str) -> String {
    NON_LETTERS.replace_all(&label.to_lowercase(), "").into_owned()
}

impl ApplicantProfile {
    fn field(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::LinkedIn => &self.linkedin_url,
            Field::GitHub => &self.github_url,
        }
    }

    /// The value to type into a form field with this label, name or
    /// placeholder. Empty profile values count as unknown.
    pub fn value_for_label(&self, label: &str) -> Option<&str> {
        let lower = normalize_label(label);
        if lower.is_empty() {
            return None;
        }

        let value = EXACT_ALIASES
            .iter()
            .find(|(_, alias)| lower == *alias)
            .map(|(field, _)| *field)
            .or_else(|| {
                FIELD_ALIASES
                    .iter()
                    .find(|(_, aliases)| aliases.iter().any(|alias| lower.contains(alias)))
                    .map(|(field, _)| *field)
            })
            .map(|field| self.field(field))
            .or_else(|| {
                if lower.contains("relocat") {
                    Some(self.willing_to_relocate.as_str())
                } else if lower.contains("authoriz") {
                    Some(self.work_authorization.as_str())
                } else if lower.contains("visa") || lower.contains("sponsor") {
                    Some(self.visa_sponsorship_required.as_str())
                } else if lower.contains("salary")
                    || lower.contains("compensation")
                    || lower.contains("expectat")
                {
                    Some(self.salary_expectation.as_str())
                } else {
                    None
                }
            })?;

        if value.is_empty() { None } else { Some(value) }
    }
}
