use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
}

/// Query string of `GET /?action=...`
#[derive(Deserialize, Debug, Default)]
pub struct ActionQuery {
    pub action: Option<String>,
    /// Command code
    pub id: Option<u32>,
    pub group: Option<u32>,
    pub value: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct InstanceStatus {
    pub id: usize,
    pub name: Option<String>,
    pub port: u16,
    pub listen: Option<String>,
    #[serde(serialize_with = "serialize_secret")]
    pub credentials: Option<String>,
    pub www_folder: Option<String>,
    pub commands_enabled: bool,
    pub pipe: Option<String>,
    pub pipe_available: bool,
    pub auto_toggle: bool,
    pub continue_toggle: bool,
}

fn serialize_secret<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(_) => serializer.serialize_some("****"),
        None => serializer.serialize_none(),
    }
}
