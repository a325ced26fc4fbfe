//! The client facade.
//!
//! # Design
//! `FluxApi` owns an `Arc<RequestHandler>` and nothing else; it is cheap to
//! clone and safe to share between threads. Users, the filtered user list
//! and the websend module receive the same handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::config::FluxApiBuilder;
use crate::error::{FluxError, RegisterError, VerifyError};
use crate::filter::FilteredUserListBuilder;
use crate::request::{decode, decode_field, RequestHandler};
use crate::types::{Announcement, Group, Website};
use crate::user::{FluxUser, UserKey};
use crate::websend::WebsendApi;

/// Integrations a website account can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntegrationType {
    Minecraft,
    Discord,
}

impl IntegrationType {
    const fn api_value(self) -> &'static str {
        match self {
            IntegrationType::Minecraft => "Minecraft",
            IntegrationType::Discord => "Discord",
        }
    }
}

/// Synchronous client for the Flux Networks website API.
#[derive(Debug, Clone)]
pub struct FluxApi {
    requests: Arc<RequestHandler>,
}

impl FluxApi {
    pub fn builder(api_url: impl Into<String>, api_key: impl Into<String>) -> FluxApiBuilder {
        FluxApiBuilder::new(api_url, api_key)
    }

    pub(crate) fn new(requests: Arc<RequestHandler>) -> Self {
        Self { requests }
    }

    pub fn request_handler(&self) -> &Arc<RequestHandler> {
        &self.requests
    }

    pub fn api_url(&self) -> &Url {
        self.requests.api_url()
    }

    pub fn api_key(&self) -> &str {
        self.requests.api_key()
    }

    pub fn website(&self) -> Result<Website, FluxError> {
        decode(self.requests.get("info", &[])?)
    }

    pub fn submit_server_info(&self, info: &Value) -> Result<(), FluxError> {
        self.requests.post("minecraft/server-info", info)?;
        Ok(())
    }

    /// Announcements visible to `user`.
    pub fn announcements(&self, user: &FluxUser) -> Result<Vec<Announcement>, FluxError> {
        user.announcements()
    }

    // Users

    pub fn user_lazy(&self, id: u64) -> FluxUser {
        FluxUser::lazy(Arc::clone(&self.requests), UserKey::Id(id))
    }

    pub fn user_lazy_by_username(&self, username: &str) -> Result<FluxUser, FluxError> {
        Ok(FluxUser::lazy(Arc::clone(&self.requests), UserKey::username(username)?))
    }

    pub fn user_lazy_by_uuid(&self, uuid: Uuid) -> FluxUser {
        FluxUser::lazy(Arc::clone(&self.requests), UserKey::MinecraftUuid(uuid))
    }

    pub fn user_lazy_by_discord_id(&self, discord_id: u64) -> Result<FluxUser, FluxError> {
        Ok(FluxUser::lazy(Arc::clone(&self.requests), UserKey::discord(discord_id)?))
    }

    pub fn user_lazy_by_key(&self, key: UserKey) -> FluxUser {
        FluxUser::lazy(Arc::clone(&self.requests), key)
    }

    pub fn user(&self, id: u64) -> Result<Option<FluxUser>, FluxError> {
        existing(self.user_lazy(id))
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<FluxUser>, FluxError> {
        existing(self.user_lazy_by_username(username)?)
    }

    pub fn user_by_uuid(&self, uuid: Uuid) -> Result<Option<FluxUser>, FluxError> {
        existing(self.user_lazy_by_uuid(uuid))
    }

    pub fn user_by_discord_id(&self, discord_id: u64) -> Result<Option<FluxUser>, FluxError> {
        existing(self.user_lazy_by_discord_id(discord_id)?)
    }

    pub fn registered_users(&self) -> FilteredUserListBuilder {
        FilteredUserListBuilder::new(Arc::clone(&self.requests))
    }

    /// Register a new account; the website emails the user to set a
    /// password.
    ///
    /// Returns the link that completes registration when the website has
    /// email verification disabled, `None` otherwise.
    pub fn register_user(
        &self,
        username: &str,
        email: &str,
        uuid: Option<Uuid>,
    ) -> Result<Option<String>, RegisterError> {
        let mut body = json!({ "username": username, "email": email });
        if let Some(uuid) = uuid {
            body["uuid"] = Value::String(uuid.to_string());
        }
        let envelope = self.requests.post("users/register", &body)?;
        Ok(envelope
            .get("link")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    // Groups

    /// `None` unless exactly one group has this id.
    pub fn group(&self, id: u64) -> Result<Option<Group>, FluxError> {
        let id = id.to_string();
        let mut groups = self.groups_where(&[("id", &id)])?;
        if groups.len() == 1 {
            Ok(groups.pop())
        } else {
            Ok(None)
        }
    }

    pub fn groups_by_name(&self, name: &str) -> Result<Vec<Group>, FluxError> {
        self.groups_where(&[("name", name)])
    }

    pub fn all_groups(&self) -> Result<Vec<Group>, FluxError> {
        self.groups_where(&[])
    }

    pub fn all_group_ids(&self) -> Result<Vec<u64>, FluxError> {
        Ok(self.all_groups()?.into_iter().map(|group| group.id).collect())
    }

    fn groups_where(&self, query: &[(&str, &str)]) -> Result<Vec<Group>, FluxError> {
        let mut envelope = self.requests.get("groups", query)?;
        decode_field(&mut envelope, "groups")
    }

    // Discord

    pub fn set_discord_bot_url(&self, url: &Url) -> Result<(), FluxError> {
        self.update_bot_settings(json!({ "url": url.as_str() }))
    }

    pub fn set_discord_guild_id(&self, guild_id: u64) -> Result<(), FluxError> {
        self.update_bot_settings(json!({ "guild_id": guild_id.to_string() }))
    }

    pub fn set_discord_bot_user(&self, username: &str, user_id: u64) -> Result<(), FluxError> {
        self.update_bot_settings(json!({
            "bot_username": username,
            "bot_user_id": user_id.to_string(),
        }))
    }

    pub fn set_discord_bot_settings(
        &self,
        url: &Url,
        guild_id: u64,
        username: &str,
        user_id: u64,
    ) -> Result<(), FluxError> {
        self.update_bot_settings(json!({
            "url": url.as_str(),
            "guild_id": guild_id.to_string(),
            "bot_username": username,
            "bot_user_id": user_id.to_string(),
        }))
    }

    fn update_bot_settings(&self, settings: Value) -> Result<(), FluxError> {
        self.requests.post("discord/update-bot-settings", &settings)?;
        Ok(())
    }

    /// Send the guild's roles (id to name) for the group sync dropdown.
    pub fn submit_discord_role_list(&self, roles: &BTreeMap<u64, String>) -> Result<(), FluxError> {
        let roles: Vec<Value> = roles
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        self.requests
            .post("discord/submit-role-list", &json!({ "roles": roles }))?;
        Ok(())
    }

    pub fn update_discord_username(
        &self,
        discord_user_id: u64,
        discord_username: &str,
    ) -> Result<(), FluxError> {
        self.update_discord_usernames(&[(discord_user_id, discord_username)])
    }

    /// Update Discord usernames in bulk. An empty slice sends nothing.
    pub fn update_discord_usernames(&self, users: &[(u64, &str)]) -> Result<(), FluxError> {
        if users.is_empty() {
            return Ok(());
        }
        let users: Vec<Value> = users
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        self.requests
            .post("discord/update-usernames", &json!({ "users": users }))?;
        Ok(())
    }

    // Integrations

    pub fn verify_minecraft(
        &self,
        verification_code: &str,
        uuid: Uuid,
        username: &str,
    ) -> Result<(), VerifyError> {
        self.verify_integration(
            IntegrationType::Minecraft,
            verification_code,
            &uuid.to_string(),
            username,
        )
    }

    pub fn verify_discord(
        &self,
        verification_code: &str,
        discord_id: u64,
        username: &str,
    ) -> Result<(), VerifyError> {
        self.verify_integration(
            IntegrationType::Discord,
            verification_code,
            &discord_id.to_string(),
            username,
        )
    }

    fn verify_integration(
        &self,
        integration: IntegrationType,
        code: &str,
        identifier: &str,
        username: &str,
    ) -> Result<(), VerifyError> {
        let body = json!({
            "integration": integration.api_value(),
            "code": code,
            "identifier": identifier,
            "username": username,
        });
        self.requests.post("integration/verify", &body)?;
        Ok(())
    }

    pub fn websend(&self) -> WebsendApi {
        WebsendApi::new(Arc::clone(&self.requests))
    }
}

fn existing(user: FluxUser) -> Result<Option<FluxUser>, FluxError> {
    Ok(user.exists()?.then_some(user))
}
