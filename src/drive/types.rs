use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A file resource as returned by the Drive v3 API.
///
/// Read-only snapshot; updates always return a fresh instance from the
/// provider rather than mutating an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size in bytes. Drive serialises int64 fields as decimal strings,
    /// so both forms are accepted.
    #[serde(
        default,
        deserialize_with = "size_from_wire",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// Response shape of `files.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<RemoteFile>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

fn size_from_wire<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_u64()),
        Some(serde_json::Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid size '{s}'"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unexpected size value: {other}"
        ))),
    }
}
