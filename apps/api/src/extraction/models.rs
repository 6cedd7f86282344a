//! Structured records extracted from résumés and job postings.
//!
//! Field names on the wire follow the extraction prompt contract (French keys);
//! the Rust side uses English names. Anything missing or `null` becomes an
//! empty string or list, never a guessed value.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeExtraction {
    #[serde(rename = "identite", default, deserialize_with = "object_or_default")]
    pub identity: Identity,
    #[serde(rename = "competences", default, deserialize_with = "clean_list")]
    pub skills: Vec<String>,
    #[serde(
        rename = "resume_experience",
        default,
        deserialize_with = "clean_string"
    )]
    pub experience_summary: String,
    #[serde(default, deserialize_with = "clean_string")]
    pub job_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "nom", default, deserialize_with = "clean_string")]
    pub name: String,
    #[serde(default, deserialize_with = "object_or_default")]
    pub contact: Contact,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "clean_string")]
    pub email: String,
    #[serde(rename = "telephone", default, deserialize_with = "clean_string")]
    pub phone: String,
    #[serde(rename = "adresse", default, deserialize_with = "clean_string")]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobExtraction {
    #[serde(default, deserialize_with = "clean_string")]
    pub job_title: String,
    #[serde(rename = "job_competences", default, deserialize_with = "clean_list")]
    pub required_skills: Vec<String>,
}

impl ResumeExtraction {
    /// Text compared against the job: experience summary followed by skills.
    pub fn profile_text(&self) -> String {
        join_text(&self.experience_summary, &self.skills)
    }

    /// Canonical skills text used for storage and résumé deduplication.
    pub fn skills_text(&self) -> String {
        self.skills.join(", ")
    }
}

impl JobExtraction {
    /// Text compared against résumés: the description followed by required skills.
    pub fn job_text(&self, description: &str) -> String {
        join_text(description, &self.required_skills)
    }

    pub fn required_skills_text(&self) -> String {
        self.required_skills.join(", ")
    }
}

fn join_text(lead: &str, items: &[String]) -> String {
    let mut text = lead.trim().to_string();
    for item in items {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(item);
    }
    text
}

/// Nested objects: anything that is not an object becomes the default.
fn object_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => T::default(),
    })
}

/// Scalars are stringified (`33612345678` → `"33612345678"`); arrays,
/// objects and `null` become empty. Whitespace is collapsed.
fn clean_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(&Value::deserialize(deserializer)?)
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default())
}

/// Lists keep their scalar items; a bare string is split on `,`.
fn clean_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<String> = match Value::deserialize(deserializer)? {
        Value::Array(values) => values.iter().filter_map(scalar_text).collect(),
        Value::String(joined) => joined.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
