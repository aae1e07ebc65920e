use serde::{Deserialize, Deserializer};

/// Some portal fields arrive as either a bare number or a string depending
/// on firmware version.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Wrapper for portal responses. Codes are strings (`"200"` on success,
/// vendor codes such as `"N120024"` otherwise).
#[derive(Debug, Clone, Deserialize)]
pub struct PortalEnvelope<T> {
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// One media-library category from `/zvideo/classification/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

/// Payload of a rescan trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct RescanTask {
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,
}

/// Payload of a rescan result query.
#[derive(Debug, Clone, Deserialize)]
pub struct RescanResult {
    pub task_status: i64,
}

/// Payload of `/action/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub list: Vec<SystemMessage>,
}

/// One system message from the NAS.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemMessage {
    #[serde(default, deserialize_with = "string_or_number_opt")]
    pub id: Option<String>,
    pub content: String,
    #[serde(deserialize_with = "string_or_number")]
    pub created_at: String,
}

fn string_or_number_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    string_or_number(deserializer).map(Some)
}
