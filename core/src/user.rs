//! Website users, resolved lazily and memoized per instance.
//!
//! # Design
//! A `FluxUser` is a `UserKey` plus a memo slot. The slot starts empty for
//! users built from a key and full for users built from server JSON. The
//! first call that needs data fetches `users/{key}` once and stores either
//! the info or "not found"; later calls read the slot. Failures (transport
//! or unexpected API codes) leave the slot empty so the next call retries.
//!
//! The slot is a mutex held across the fetch, so concurrent first access on
//! one instance still performs a single request. Distinct instances never
//! share a slot, even for the same key.
//!
//! Equality and hashing only look at the key: resolution never changes the
//! identity of a user.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ActivateError, ErrorCode, FluxError, InvalidUserKey, ReportError};
use crate::request::{decode, decode_field, RequestHandler};
use crate::types::{format_website_uuid, Announcement, CustomProfileField, Group, UserInfo};

/// The one identifier a user was looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    Id(u64),
    Username(String),
    MinecraftUuid(Uuid),
    DiscordId(u64),
}

impl UserKey {
    pub fn username(username: impl Into<String>) -> Result<Self, InvalidUserKey> {
        let username = username.into();
        if username.is_empty() {
            return Err(InvalidUserKey::EmptyUsername);
        }
        Ok(UserKey::Username(username))
    }

    pub fn discord(discord_id: u64) -> Result<Self, InvalidUserKey> {
        if discord_id == 0 {
            return Err(InvalidUserKey::ZeroDiscordId);
        }
        Ok(UserKey::DiscordId(discord_id))
    }

    /// Build a key from optional parts, exactly one of which must be set.
    pub fn from_parts(
        id: Option<u64>,
        username: Option<&str>,
        uuid: Option<Uuid>,
        discord_id: Option<u64>,
    ) -> Result<Self, InvalidUserKey> {
        let present = [id.is_some(), username.is_some(), uuid.is_some(), discord_id.is_some()]
            .into_iter()
            .filter(|present| *present)
            .count();
        match (present, id, username, uuid, discord_id) {
            (0, ..) => Err(InvalidUserKey::Missing),
            (1, Some(id), ..) => Ok(UserKey::Id(id)),
            (1, _, Some(username), ..) => UserKey::username(username),
            (1, _, _, Some(uuid), _) => Ok(UserKey::MinecraftUuid(uuid)),
            (1, .., Some(discord_id)) => UserKey::discord(discord_id),
            (count, ..) => Err(InvalidUserKey::Conflicting(count)),
        }
    }

    /// The `{key}` segment of `users/{key}`, percent-encoded.
    pub fn path_segment(&self) -> String {
        match self {
            UserKey::Username(username) => format!("username:{}", urlencoding::encode(username)),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Id(id) => write!(f, "id:{id}"),
            UserKey::Username(username) => write!(f, "username:{username}"),
            UserKey::MinecraftUuid(uuid) => {
                write!(f, "integration_id:minecraft:{}", format_website_uuid(*uuid))
            }
            UserKey::DiscordId(id) => write!(f, "integration_id:discord:{id}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Resolution {
    Found(Arc<UserInfo>),
    NotFound,
}

/// A user of the website, identified by a [`UserKey`].
pub struct FluxUser {
    requests: Arc<RequestHandler>,
    key: UserKey,
    state: Mutex<Option<Resolution>>,
}

impl FluxUser {
    /// A user that has not been fetched yet. No request is made until data
    /// is needed.
    pub fn lazy(requests: Arc<RequestHandler>, key: UserKey) -> Self {
        Self {
            requests,
            key,
            state: Mutex::new(None),
        }
    }

    /// A user hydrated from server JSON, keyed by its numeric id.
    pub fn from_info(requests: Arc<RequestHandler>, info: UserInfo) -> Self {
        Self {
            requests,
            key: UserKey::Id(info.id),
            state: Mutex::new(Some(Resolution::Found(Arc::new(info)))),
        }
    }

    pub fn key(&self) -> &UserKey {
        &self.key
    }

    /// Whether this instance has already been resolved, found or not.
    pub fn is_resolved(&self) -> bool {
        self.state.lock().is_some()
    }

    pub fn exists(&self) -> Result<bool, FluxError> {
        Ok(matches!(self.resolve()?, Resolution::Found(_)))
    }

    /// All user data. Fails with [`FluxError::UserNotFound`] when the
    /// website does not know this user.
    pub fn info(&self) -> Result<Arc<UserInfo>, FluxError> {
        match self.resolve()? {
            Resolution::Found(info) => Ok(info),
            Resolution::NotFound => Err(FluxError::UserNotFound(self.key.clone())),
        }
    }

    /// Answered from the key, without a request, for users looked up by id.
    pub fn id(&self) -> Result<u64, FluxError> {
        match self.key {
            UserKey::Id(id) => Ok(id),
            _ => Ok(self.info()?.id),
        }
    }

    pub fn username(&self) -> Result<String, FluxError> {
        Ok(self.info()?.username.clone())
    }

    pub fn display_name(&self) -> Result<String, FluxError> {
        Ok(self.info()?.display_name().to_string())
    }

    pub fn uuid(&self) -> Result<Option<Uuid>, FluxError> {
        Ok(self.info()?.uuid)
    }

    pub fn email(&self) -> Result<Option<String>, FluxError> {
        Ok(self.info()?.email.clone())
    }

    pub fn is_banned(&self) -> Result<bool, FluxError> {
        Ok(self.info()?.banned)
    }

    pub fn is_verified(&self) -> Result<bool, FluxError> {
        Ok(self.info()?.verified)
    }

    pub fn discord_id(&self) -> Result<Option<u64>, FluxError> {
        Ok(self.info()?.discord_id)
    }

    pub fn language(&self) -> Result<Option<String>, FluxError> {
        Ok(self.info()?.language.clone())
    }

    pub fn registered_at(&self) -> Result<Option<DateTime<Utc>>, FluxError> {
        Ok(self.info()?.registered_at)
    }

    pub fn last_online(&self) -> Result<Option<DateTime<Utc>>, FluxError> {
        Ok(self.info()?.last_online)
    }

    pub fn groups(&self) -> Result<Vec<Group>, FluxError> {
        Ok(self.info()?.groups.clone())
    }

    pub fn primary_group(&self) -> Result<Option<Group>, FluxError> {
        Ok(self.info()?.primary_group().cloned())
    }

    pub fn profile_fields(&self) -> Result<Vec<CustomProfileField>, FluxError> {
        Ok(self.info()?.profile_fields.clone())
    }

    /// Announcements visible to this user. Always a fresh request.
    pub fn announcements(&self) -> Result<Vec<Announcement>, FluxError> {
        let mut envelope = self
            .requests
            .get(&format!("{}/announcements", self.path()), &[])?;
        decode_field(&mut envelope, "announcements")
    }

    /// File a report against `reported` on behalf of this user.
    pub fn create_report(&self, reported: &FluxUser, content: &str) -> Result<(), ReportError> {
        // Lookup codes belong to `users/{key}`, not to the report endpoint.
        let reporter = self.id().map_err(ReportError::Other)?;
        let reported = reported.id().map_err(ReportError::Other)?;
        let body = json!({
            "reporter": reporter,
            "reported": reported,
            "content": content,
        });
        self.requests
            .post("reports/create", &body)
            .map_err(ReportError::from)?;
        Ok(())
    }

    /// Activate the account without email confirmation.
    pub fn activate(&self) -> Result<(), ActivateError> {
        self.requests
            .post(&format!("{}/verify", self.path()), &json!({}))?;
        Ok(())
    }

    pub fn set_discord_id(&self, discord_id: u64) -> Result<(), FluxError> {
        self.requests.post(
            &format!("{}/update-discord-id", self.path()),
            &json!({ "discord_id": discord_id }),
        )?;
        Ok(())
    }

    fn path(&self) -> String {
        format!("users/{}", self.key.path_segment())
    }

    fn resolve(&self) -> Result<Resolution, FluxError> {
        let mut state = self.state.lock();
        if let Some(resolution) = state.as_ref() {
            return Ok(resolution.clone());
        }
        let resolution = self.fetch()?;
        *state = Some(resolution.clone());
        Ok(resolution)
    }

    fn fetch(&self) -> Result<Resolution, FluxError> {
        match self.requests.get(&self.path(), &[]) {
            Ok(envelope) => {
                if envelope.get("exists").and_then(Value::as_bool) == Some(false) {
                    return Ok(Resolution::NotFound);
                }
                Ok(Resolution::Found(Arc::new(decode(envelope)?)))
            }
            Err(err) if err.kind() == Some(ErrorCode::UnableToFindUser) => Ok(Resolution::NotFound),
            Err(err) => Err(err),
        }
    }
}

/// Clones are independent instances that start from this one's current
/// resolution state.
impl Clone for FluxUser {
    fn clone(&self) -> Self {
        Self {
            requests: Arc::clone(&self.requests),
            key: self.key.clone(),
            state: Mutex::new(self.state.lock().clone()),
        }
    }
}

impl PartialEq for FluxUser {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for FluxUser {}

impl Hash for FluxUser {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for FluxUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("FluxUser");
        debug.field("key", &self.key);
        // The slot stays locked for a whole fetch.
        match self.state.try_lock() {
            Some(state) => debug.field("state", &*state),
            None => debug.field("state", &format_args!("<resolving>")),
        };
        debug.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, HttpResponse, Transport};

    struct Offline;

    impl Transport for Offline {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse::new(200, r#"{"exists":false}"#))
        }
    }

    fn offline_user(key: UserKey) -> FluxUser {
        let url = Url::parse("https://flux.example.com/api/v2").unwrap();
        let requests = RequestHandler::new(url, "key", "ua", Box::new(Offline), None);
        FluxUser::lazy(Arc::new(requests), key)
    }

    #[test]
    fn debug_does_not_wait_for_a_resolution_in_progress() {
        let user = offline_user(UserKey::Id(7));
        {
            let _resolving = user.state.lock();
            let debug = format!("{user:?}");
            assert!(debug.contains("<resolving>"), "{debug}");
            assert!(debug.contains("Id(7)"), "{debug}");
        }
        assert!(!format!("{user:?}").contains("<resolving>"));
    }

    #[test]
    fn from_parts_needs_exactly_one_identifier() {
        assert_eq!(UserKey::from_parts(None, None, None, None), Err(InvalidUserKey::Missing));
        assert_eq!(UserKey::from_parts(Some(4), None, None, None), Ok(UserKey::Id(4)));
        assert_eq!(
            UserKey::from_parts(None, Some("Derkades"), None, None),
            Ok(UserKey::Username("Derkades".to_string()))
        );
        assert_eq!(
            UserKey::from_parts(None, None, Some(Uuid::nil()), None),
            Ok(UserKey::MinecraftUuid(Uuid::nil()))
        );
        assert_eq!(
            UserKey::from_parts(None, None, None, Some(42)),
            Ok(UserKey::DiscordId(42))
        );
        assert_eq!(
            UserKey::from_parts(Some(1), Some("Derkades"), Some(Uuid::nil()), None),
            Err(InvalidUserKey::Conflicting(3))
        );
    }

    #[test]
    fn constructors_validate_their_identifier() {
        assert_eq!(UserKey::username(""), Err(InvalidUserKey::EmptyUsername));
        assert_eq!(UserKey::discord(0), Err(InvalidUserKey::ZeroDiscordId));
        assert_eq!(
            UserKey::from_parts(None, Some(""), None, None),
            Err(InvalidUserKey::EmptyUsername)
        );
    }

    #[test]
    fn path_segments() {
        assert_eq!(UserKey::Id(5).path_segment(), "id:5");
        assert_eq!(
            UserKey::Username("a b/c".to_string()).path_segment(),
            "username:a%20b%2Fc"
        );
        let uuid = Uuid::parse_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap();
        assert_eq!(
            UserKey::MinecraftUuid(uuid).path_segment(),
            "integration_id:minecraft:069a79f444e94726a5befca90e38aaf5"
        );
        assert_eq!(
            UserKey::DiscordId(256).path_segment(),
            "integration_id:discord:256"
        );
    }
}
