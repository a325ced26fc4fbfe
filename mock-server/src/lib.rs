//! In-memory imitation of the Flux Networks website API.
//!
//! Every route lives under `/{api_key}/`. Failures answer with the website's
//! error envelope, `{"error": <code>, "meta": ...}`, and status 400.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_API_KEY: &str = "test-key";
pub const FLUX_VERSION: &str = "2.0.0-pr13";

// Error codes used by the mock.
pub const INVALID_API_KEY: i64 = 1;
pub const INVALID_API_METHOD: i64 = 3;
pub const INVALID_GET_POST_CONTENTS: i64 = 6;
pub const INVALID_EMAIL_ADDRESS: i64 = 7;
pub const INVALID_USERNAME: i64 = 8;
pub const EMAIL_ALREADY_EXISTS: i64 = 10;
pub const USERNAME_ALREADY_EXISTS: i64 = 11;
pub const UUID_ALREADY_EXISTS: i64 = 12;
pub const UNABLE_TO_FIND_USER: i64 = 16;
pub const USER_CREATING_REPORT_BANNED: i64 = 21;
pub const USER_ALREADY_HAS_OPEN_REPORT: i64 = 22;
pub const CANNOT_REPORT_YOURSELF: i64 = 26;
pub const INVALID_SERVER_ID: i64 = 27;
pub const INVALID_VALIDATE_CODE: i64 = 28;
pub const ACCOUNT_ALREADY_ACTIVATED: i64 = 32;
pub const INVALID_INTEGRATION: i64 = 37;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub staff: bool,
    pub order: i64,
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub uuid: Option<Uuid>,
    pub discord_id: Option<u64>,
    pub banned: bool,
    pub verified: bool,
    pub group_ids: Vec<u64>,
    pub registered_timestamp: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct WebsendCommand {
    pub id: u64,
    pub command: String,
}

/// A verification code waiting to be claimed by an integration.
#[derive(Clone, Debug)]
pub struct PendingVerification {
    pub user_id: u64,
    pub code: String,
}

#[derive(Debug, Default)]
pub struct Db {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub reports: Vec<(u64, u64, String)>,
    pub verifications: Vec<PendingVerification>,
    pub commands: HashMap<u64, Vec<WebsendCommand>>,
    pub console: HashMap<u64, Vec<String>>,
    pub bot_settings: serde_json::Map<String, Value>,
    pub discord_roles: Vec<Value>,
    pub discord_usernames: HashMap<u64, String>,
    next_user_id: u64,
}

impl Db {
    /// A website with a handful of users and groups.
    pub fn seeded() -> Self {
        let groups = vec![
            Group { id: 1, name: "Member".to_string(), staff: false, order: 5 },
            Group { id: 2, name: "Admin".to_string(), staff: true, order: 1 },
            Group { id: 3, name: "Staff & Co".to_string(), staff: true, order: 2 },
        ];
        let users = vec![
            User {
                id: 1,
                username: "Admin".to_string(),
                email: "admin@example.com".to_string(),
                uuid: None,
                discord_id: None,
                banned: false,
                verified: true,
                group_ids: vec![2, 1],
                registered_timestamp: 1_600_000_000,
            },
            User {
                id: 2,
                username: "Derkades".to_string(),
                email: "derkades@example.com".to_string(),
                uuid: Uuid::try_parse("069a79f444e94726a5befca90e38aaf5").ok(),
                discord_id: Some(421),
                banned: false,
                verified: true,
                group_ids: vec![1],
                registered_timestamp: 1_600_000_100,
            },
            User {
                id: 3,
                username: "Griefer".to_string(),
                email: "griefer@example.com".to_string(),
                uuid: None,
                discord_id: None,
                banned: true,
                verified: false,
                group_ids: vec![1],
                registered_timestamp: 1_600_000_200,
            },
        ];
        let mut commands = HashMap::new();
        commands.insert(
            1,
            vec![WebsendCommand { id: 1, command: "say hello".to_string() }],
        );
        Self {
            users,
            groups,
            verifications: vec![PendingVerification { user_id: 1, code: "ABC123".to_string() }],
            commands,
            next_user_id: 4,
            ..Self::default()
        }
    }

    fn user_json(&self, user: &User) -> Value {
        let groups: Vec<&Group> = self
            .groups
            .iter()
            .filter(|group| user.group_ids.contains(&group.id))
            .collect();
        json!({
            "exists": true,
            "id": user.id,
            "username": user.username,
            "displayname": user.username,
            "uuid": user
                .uuid
                .map_or_else(|| "none".to_string(), |uuid| uuid.simple().to_string()),
            "email": user.email,
            "banned": user.banned,
            "verified": user.verified,
            "discord_id": user.discord_id,
            "locale": "en_UK",
            "registered_timestamp": user.registered_timestamp,
            "groups": groups,
            "profile_fields": [],
        })
    }

    /// Find a user by a `users/{key}` segment such as `id:3` or
    /// `integration_id:discord:421`.
    fn find_user(&self, key: &str) -> Option<&User> {
        self.users.iter().find(|user| matches_key(user, key))
    }

    fn find_user_mut(&mut self, key: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|user| matches_key(user, key))
    }
}

fn matches_key(user: &User, key: &str) -> bool {
    if let Some(id) = key.strip_prefix("id:") {
        return id.parse() == Ok(user.id);
    }
    if let Some(username) = key.strip_prefix("username:") {
        return user.username == username;
    }
    if let Some(uuid) = key.strip_prefix("integration_id:minecraft:") {
        return user.uuid.is_some() && Uuid::try_parse(uuid).ok() == user.uuid;
    }
    if let Some(discord_id) = key.strip_prefix("integration_id:discord:") {
        return discord_id.parse().ok() == user.discord_id;
    }
    false
}

#[derive(Clone)]
pub struct AppState {
    pub api_key: Arc<str>,
    pub db: Arc<RwLock<Db>>,
}

/// An error envelope.
#[derive(Debug)]
pub struct ApiFailure {
    pub code: i64,
    pub meta: Option<String>,
}

impl ApiFailure {
    fn new(code: i64) -> Self {
        Self { code, meta: None }
    }

    fn with_meta(code: i64, meta: impl Into<String>) -> Self {
        Self { code, meta: Some(meta.into()) }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = match self.meta {
            Some(meta) => json!({ "error": self.code, "meta": meta }),
            None => json!({ "error": self.code }),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiFailure>;

pub fn app() -> Router {
    app_with_key(DEFAULT_API_KEY)
}

pub fn app_with_key(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        db: Arc::new(RwLock::new(Db::seeded())),
    };
    Router::new()
        .route("/{key}/info", get(info))
        .route("/{key}/users", get(list_users))
        .route("/{key}/users/register", post(register_user))
        .route("/{key}/users/{user}", get(get_user))
        .route("/{key}/users/{user}/announcements", get(announcements))
        .route("/{key}/users/{user}/verify", post(activate_user))
        .route("/{key}/users/{user}/update-discord-id", post(update_discord_id))
        .route("/{key}/groups", get(list_groups))
        .route("/{key}/reports/create", post(create_report))
        .route("/{key}/integration/verify", post(verify_integration))
        .route("/{key}/discord/update-bot-settings", post(update_bot_settings))
        .route("/{key}/discord/submit-role-list", post(submit_role_list))
        .route("/{key}/discord/update-usernames", post(update_usernames))
        .route("/{key}/websend/commands", get(websend_commands))
        .route("/{key}/websend/console", post(websend_console))
        .fallback(|| async { ApiFailure::new(INVALID_API_METHOD) })
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_key(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_key(api_key)).await
}

fn authorize(state: &AppState, key: &str) -> Result<(), ApiFailure> {
    if key == &*state.api_key {
        Ok(())
    } else {
        log::warn!("rejected request with wrong API key");
        Err(ApiFailure::new(INVALID_API_KEY))
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiFailure> {
    serde_json::from_slice(body)
        .map_err(|err| ApiFailure::with_meta(INVALID_GET_POST_CONTENTS, err.to_string()))
}

fn ok() -> ApiResult {
    Ok(Json(json!({})))
}

async fn info(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult {
    authorize(&state, &key)?;
    Ok(Json(json!({
        "flux_version": FLUX_VERSION,
        "version_update": { "update": false },
        "modules": ["Core", "Forum"],
        "language": "EnglishUK",
    })))
}

async fn list_users(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(filters): Query<HashMap<String, String>>,
) -> ApiResult {
    authorize(&state, &key)?;
    let db = state.db.read().await;
    let flag = |name: &str| filters.get(name).map(|value| value == "true");
    let group_id = filters.get("group_id").and_then(|id| id.parse::<u64>().ok());

    let users: Vec<Value> = db
        .users
        .iter()
        .filter(|user| flag("banned").map_or(true, |banned| user.banned == banned))
        .filter(|user| flag("verified").map_or(true, |verified| user.verified == verified))
        .filter(|user| {
            flag("discord_linked").map_or(true, |linked| user.discord_id.is_some() == linked)
        })
        .filter(|user| group_id.map_or(true, |id| user.group_ids.contains(&id)))
        .map(|user| db.user_json(user))
        .collect();
    Ok(Json(json!({ "users": users })))
}

async fn get_user(
    State(state): State<AppState>,
    Path((key, user)): Path<(String, String)>,
) -> ApiResult {
    authorize(&state, &key)?;
    let db = state.db.read().await;
    let found = db
        .find_user(&user)
        .ok_or_else(|| ApiFailure::with_meta(UNABLE_TO_FIND_USER, user.clone()))?;
    Ok(Json(db.user_json(found)))
}

async fn announcements(
    State(state): State<AppState>,
    Path((key, user)): Path<(String, String)>,
) -> ApiResult {
    authorize(&state, &key)?;
    let db = state.db.read().await;
    let found = db
        .find_user(&user)
        .ok_or_else(|| ApiFailure::with_meta(UNABLE_TO_FIND_USER, user.clone()))?;
    let mut announcements = vec![json!({
        "id": 1,
        "header": "Welcome",
        "message": "Welcome to the server",
        "pages": ["index"],
        "groups": [1, 2],
    })];
    if found.group_ids.contains(&2) {
        announcements.push(json!({
            "id": 2,
            "header": "Staff meeting",
            "message": "Friday at 8",
            "pages": ["index", "forum"],
            "groups": [2],
        }));
    }
    Ok(Json(json!({ "announcements": announcements })))
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    uuid: Option<String>,
}

async fn register_user(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &key)?;
    let request: RegisterRequest = parse_body(&body)?;
    if request.username.is_empty() || request.username.len() > 20 {
        return Err(ApiFailure::new(INVALID_USERNAME));
    }
    if !request.email.contains('@') {
        return Err(ApiFailure::new(INVALID_EMAIL_ADDRESS));
    }
    let uuid = match request.uuid.as_deref() {
        Some(uuid) => Some(
            Uuid::try_parse(uuid)
                .map_err(|err| ApiFailure::with_meta(INVALID_GET_POST_CONTENTS, err.to_string()))?,
        ),
        None => None,
    };

    let mut db = state.db.write().await;
    if db.users.iter().any(|user| user.username == request.username) {
        return Err(ApiFailure::new(USERNAME_ALREADY_EXISTS));
    }
    if db.users.iter().any(|user| user.email == request.email) {
        return Err(ApiFailure::new(EMAIL_ALREADY_EXISTS));
    }
    if uuid.is_some() && db.users.iter().any(|user| user.uuid == uuid) {
        return Err(ApiFailure::new(UUID_ALREADY_EXISTS));
    }

    let id = db.next_user_id;
    db.next_user_id += 1;
    db.users.push(User {
        id,
        username: request.username.clone(),
        email: request.email,
        uuid,
        discord_id: None,
        banned: false,
        verified: false,
        group_ids: vec![1],
        registered_timestamp: 1_700_000_000,
    });
    log::info!("registered user {id} ({})", request.username);
    Ok(Json(json!({
        "user_id": id,
        "link": format!("https://flux.example.com/complete_signup/?c={}", Uuid::new_v4().simple()),
    })))
}

async fn activate_user(
    State(state): State<AppState>,
    Path((key, user)): Path<(String, String)>,
) -> ApiResult {
    authorize(&state, &key)?;
    let mut db = state.db.write().await;
    let found = db
        .find_user_mut(&user)
        .ok_or_else(|| ApiFailure::with_meta(UNABLE_TO_FIND_USER, user.clone()))?;
    if found.verified {
        return Err(ApiFailure::new(ACCOUNT_ALREADY_ACTIVATED));
    }
    found.verified = true;
    ok()
}

#[derive(Deserialize)]
struct DiscordIdRequest {
    discord_id: u64,
}

async fn update_discord_id(
    State(state): State<AppState>,
    Path((key, user)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &key)?;
    let request: DiscordIdRequest = parse_body(&body)?;
    let mut db = state.db.write().await;
    let found = db
        .find_user_mut(&user)
        .ok_or_else(|| ApiFailure::with_meta(UNABLE_TO_FIND_USER, user.clone()))?;
    found.discord_id = Some(request.discord_id);
    ok()
}

#[derive(Deserialize)]
struct GroupQuery {
    id: Option<u64>,
    name: Option<String>,
}

async fn list_groups(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<GroupQuery>,
) -> ApiResult {
    authorize(&state, &key)?;
    let db = state.db.read().await;
    let groups: Vec<&Group> = db
        .groups
        .iter()
        .filter(|group| query.id.map_or(true, |id| group.id == id))
        .filter(|group| query.name.as_ref().map_or(true, |name| &group.name == name))
        .collect();
    Ok(Json(json!({ "groups": groups })))
}

#[derive(Deserialize)]
struct ReportRequest {
    reporter: u64,
    reported: u64,
    content: String,
}

async fn create_report(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &key)?;
    let request: ReportRequest = parse_body(&body)?;
    let mut db = state.db.write().await;
    let reporter = db
        .users
        .iter()
        .find(|user| user.id == request.reporter)
        .ok_or_else(|| ApiFailure::with_meta(UNABLE_TO_FIND_USER, request.reporter.to_string()))?;
    if !db.users.iter().any(|user| user.id == request.reported) {
        return Err(ApiFailure::with_meta(UNABLE_TO_FIND_USER, request.reported.to_string()));
    }
    if request.reporter == request.reported {
        return Err(ApiFailure::new(CANNOT_REPORT_YOURSELF));
    }
    if reporter.banned {
        return Err(ApiFailure::new(USER_CREATING_REPORT_BANNED));
    }
    if db
        .reports
        .iter()
        .any(|(from, to, _)| *from == request.reporter && *to == request.reported)
    {
        return Err(ApiFailure::new(USER_ALREADY_HAS_OPEN_REPORT));
    }
    db.reports.push((request.reporter, request.reported, request.content));
    ok()
}

#[derive(Deserialize)]
struct VerifyRequest {
    integration: String,
    code: String,
    identifier: String,
    username: String,
}

async fn verify_integration(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &key)?;
    let request: VerifyRequest = parse_body(&body)?;
    let mut db = state.db.write().await;
    let position = db
        .verifications
        .iter()
        .position(|pending| pending.code == request.code)
        .ok_or_else(|| ApiFailure::new(INVALID_VALIDATE_CODE))?;
    let user_id = db.verifications[position].user_id;

    let invalid = |err: String| ApiFailure::with_meta(INVALID_GET_POST_CONTENTS, err);
    let user = db
        .users
        .iter_mut()
        .find(|user| user.id == user_id)
        .ok_or_else(|| ApiFailure::new(UNABLE_TO_FIND_USER))?;
    match request.integration.as_str() {
        "Minecraft" => {
            let uuid = Uuid::try_parse(&request.identifier).map_err(|err| invalid(err.to_string()))?;
            user.uuid = Some(uuid);
        }
        "Discord" => {
            let discord_id = request
                .identifier
                .parse()
                .map_err(|_| invalid(request.identifier.clone()))?;
            user.discord_id = Some(discord_id);
        }
        other => return Err(ApiFailure::with_meta(INVALID_INTEGRATION, other)),
    }
    log::info!("user {user_id} linked {} account {}", request.integration, request.username);
    db.verifications.remove(position);
    ok()
}

async fn update_bot_settings(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &key)?;
    let settings: serde_json::Map<String, Value> = parse_body(&body)?;
    state.db.write().await.bot_settings.extend(settings);
    ok()
}

#[derive(Deserialize)]
struct RoleList {
    roles: Vec<Value>,
}

async fn submit_role_list(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &key)?;
    let request: RoleList = parse_body(&body)?;
    state.db.write().await.discord_roles = request.roles;
    ok()
}

#[derive(Deserialize)]
struct DiscordUsername {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct DiscordUsernames {
    users: Vec<DiscordUsername>,
}

async fn update_usernames(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &key)?;
    let request: DiscordUsernames = parse_body(&body)?;
    let mut db = state.db.write().await;
    for user in request.users {
        db.discord_usernames.insert(user.id, user.name);
    }
    ok()
}

#[derive(Deserialize)]
struct ServerQuery {
    server_id: Option<u64>,
}

async fn websend_commands(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ServerQuery>,
) -> ApiResult {
    authorize(&state, &key)?;
    let server_id = query.server_id.ok_or_else(|| ApiFailure::new(INVALID_SERVER_ID))?;
    let db = state.db.read().await;
    let commands = db.commands.get(&server_id).cloned().unwrap_or_default();
    Ok(Json(json!({ "commands": commands })))
}

#[derive(Deserialize)]
struct ConsoleRequest {
    server_id: u64,
    content: Vec<String>,
}

async fn websend_console(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult {
    authorize(&state, &key)?;
    let request: ConsoleRequest = parse_body(&body)?;
    state
        .db
        .write()
        .await
        .console
        .entry(request.server_id)
        .or_default()
        .extend(request.content);
    ok()
}
