//! Value objects hydrated from website JSON.
//!
//! # Design
//! Everything here is built once from one JSON object and never changes.
//! Wire names follow the website (`flux_version`, `displayname`,
//! `registered_timestamp`); Rust names follow Rust. The website sends
//! Minecraft UUIDs as 32 hex characters without dashes, which are rebuilt
//! into a `Uuid` on the way in.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

use crate::error::UnknownVersionError;
use crate::version::FluxVersion;

/// Parse a UUID as sent by the website (no dashes) into a `Uuid`.
pub fn parse_website_uuid(uuid: &str) -> Result<Uuid, uuid::Error> {
    Uuid::try_parse(uuid)
}

/// Format a UUID the way the website stores it: 32 hex characters.
pub fn format_website_uuid(uuid: Uuid) -> String {
    uuid.simple().to_string()
}

fn deserialize_website_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") | Some("none") => Ok(None),
        Some(uuid) => parse_website_uuid(uuid)
            .map(Some)
            .map_err(|err| serde::de::Error::custom(format!("invalid uuid '{uuid}': {err}"))),
    }
}

/// A website group. Two groups are equal when their ids are equal.
#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub staff: bool,
    #[serde(default)]
    pub order: i64,
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Group {}

impl Hash for Group {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Kind of a custom profile field, sent by the website as 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub enum CustomProfileFieldType {
    Text,
    TextArea,
    Date,
}

impl TryFrom<u8> for CustomProfileFieldType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CustomProfileFieldType::Text),
            2 => Ok(CustomProfileFieldType::TextArea),
            3 => Ok(CustomProfileFieldType::Date),
            other => Err(format!("unknown profile field type {other}")),
        }
    }
}

/// A custom profile field and, when read from a user, that user's value.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomProfileField {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: CustomProfileFieldType,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl PartialEq for CustomProfileField {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CustomProfileField {}

impl Hash for CustomProfileField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The website encodes an empty field list as `[]` and a populated one as
/// an object keyed by field id.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileFieldsWire {
    Keyed(BTreeMap<String, CustomProfileField>),
    Listed(Vec<CustomProfileField>),
}

fn deserialize_profile_fields<'de, D>(deserializer: D) -> Result<Vec<CustomProfileField>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ProfileFieldsWire::deserialize(deserializer)? {
        ProfileFieldsWire::Keyed(fields) => fields.into_values().collect(),
        ProfileFieldsWire::Listed(fields) => fields,
    })
}

/// Everything the website reports about one user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: u64,
    pub username: String,
    #[serde(rename = "displayname", default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_website_uuid")]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub discord_id: Option<u64>,
    #[serde(default, alias = "locale")]
    pub language: Option<String>,
    #[serde(
        rename = "registered_timestamp",
        default,
        with = "chrono::serde::ts_seconds_option"
    )]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "last_online_timestamp",
        default,
        with = "chrono::serde::ts_seconds_option"
    )]
    pub last_online: Option<DateTime<Utc>>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default, deserialize_with = "deserialize_profile_fields")]
    pub profile_fields: Vec<CustomProfileField>,
}

impl UserInfo {
    /// Display name, falling back to the username when none is set.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// The group with the lowest order, which the website shows first.
    pub fn primary_group(&self) -> Option<&Group> {
        self.groups.iter().min_by_key(|group| group.order)
    }
}

/// A website announcement. Fields this client does not model are kept in
/// `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct Announcement {
    pub id: u64,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub groups: Vec<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Information about an available website update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub version: String,
    pub urgent: bool,
}

impl Update {
    pub fn parsed_version(&self) -> Result<FluxVersion, UnknownVersionError> {
        FluxVersion::parse(&self.version)
    }
}

/// Response of the `info` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "WebsiteWire")]
pub struct Website {
    pub version: String,
    pub update: Option<Update>,
    pub modules: Vec<String>,
    pub language: String,
}

impl Website {
    /// Resolve the reported version against the compiled-in catalog.
    pub fn parsed_version(&self) -> Result<FluxVersion, UnknownVersionError> {
        FluxVersion::parse(&self.version)
    }
}

#[derive(Deserialize)]
struct WebsiteWire {
    flux_version: String,
    modules: Vec<String>,
    version_update: Option<UpdateWire>,
    language: String,
}

#[derive(Deserialize)]
struct UpdateWire {
    update: bool,
    version: Option<String>,
    urgent: Option<bool>,
}

impl TryFrom<WebsiteWire> for Website {
    type Error = String;

    fn try_from(wire: WebsiteWire) -> Result<Self, Self::Error> {
        let update = match wire.version_update {
            Some(UpdateWire {
                update: true,
                version,
                urgent,
            }) => Some(Update {
                version: version.ok_or("version_update.version is missing")?,
                urgent: urgent.ok_or("version_update.urgent is missing")?,
            }),
            _ => None,
        };
        Ok(Website {
            version: wire.flux_version,
            update,
            modules: wire.modules,
            language: wire.language,
        })
    }
}

/// A console command queued for a Minecraft server by the Websend module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebsendCommand {
    pub id: u64,
    #[serde(rename = "command")]
    pub command_line: String,
}
