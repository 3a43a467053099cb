use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::VaultError;

// ============================================================================
// Field Vocabulary
// ============================================================================

/// The closed set of semantic fields a profile can carry.
///
/// Declaration order is the canonical order: profiles iterate in it and the
/// fill engine walks its mapping table in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileField {
    Name,
    Email,
    Phone,
    Address,
    City,
    State,
    Zip,
    JobTitle,
    Salary,
    StartDate,
    Resume,
    Country,
    Education,
    Experience,
    Skills,
}

impl ProfileField {
    pub const ALL: [ProfileField; 15] = [
        ProfileField::Name,
        ProfileField::Email,
        ProfileField::Phone,
        ProfileField::Address,
        ProfileField::City,
        ProfileField::State,
        ProfileField::Zip,
        ProfileField::JobTitle,
        ProfileField::Salary,
        ProfileField::StartDate,
        ProfileField::Resume,
        ProfileField::Country,
        ProfileField::Education,
        ProfileField::Experience,
        ProfileField::Skills,
    ];

    /// Wire key, as used by the profile service and in storage
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Email => "email",
            ProfileField::Phone => "phone",
            ProfileField::Address => "address",
            ProfileField::City => "city",
            ProfileField::State => "state",
            ProfileField::Zip => "zip",
            ProfileField::JobTitle => "job-title",
            ProfileField::Salary => "salary",
            ProfileField::StartDate => "start-date",
            ProfileField::Resume => "resume",
            ProfileField::Country => "country",
            ProfileField::Education => "education",
            ProfileField::Experience => "experience",
            ProfileField::Skills => "skills",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        ProfileField::ALL
            .into_iter()
            .find(|field| field.as_str() == key)
            .ok_or_else(|| VaultError::InvalidProfile(format!("Unknown field: {}", s)))
    }
}

// ============================================================================
// Profile Record
// ============================================================================

/// The user's application data, one string per semantic field.
///
/// Deserialization is lenient toward whatever the profile service sends:
/// unknown keys and `null` values are dropped, numbers and booleans are
/// stringified. Nested values are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Profile {
    fields: BTreeMap<ProfileField, String>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, handy for tests and fixtures
    pub fn with(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Non-empty value for a field. Empty strings read as absent.
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.fields
            .get(&field)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn remove(&mut self, field: ProfileField) -> Option<String> {
        self.fields.remove(&field)
    }

    /// Number of fields with a non-empty value
    pub fn len(&self) -> usize {
        self.fields.values().filter(|v| !v.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fields in canonical order, including ones set to an empty string
    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// Parse a profile from raw JSON text
    pub fn from_json(text: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Parse a profile from an already-decoded JSON value
    pub fn from_value(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(map) => Self::try_from(map),
            other => Err(VaultError::InvalidProfile(format!(
                "Expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl TryFrom<Map<String, Value>> for Profile {
    type Error = VaultError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut profile = Profile::new();

        for (key, value) in map {
            let Ok(field) = key.parse::<ProfileField>() else {
                tracing::debug!(key = %key, "ignoring unknown profile key");
                continue;
            };

            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(VaultError::InvalidProfile(format!(
                        "Field {} must be a scalar, got {}",
                        field,
                        json_kind(&other)
                    )))
                }
            };

            profile.set(field, text);
        }

        Ok(profile)
    }
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl FromIterator<(ProfileField, String)> for Profile {
    fn from_iter<I: IntoIterator<Item = (ProfileField, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================
