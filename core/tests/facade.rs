//! Facade operations: wire format of each request and error promotion.

mod common;

use std::collections::BTreeMap;

use common::{api, ScriptedTransport};
use flux_core::filter::{BANNED, GROUP_ID, VERIFIED};
use flux_core::{
    ErrorCode, FluxError, FluxVersion, HttpMethod, RegisterError, ReportError, UserFilter,
    VerifyError,
};
use serde_json::json;
use url::Url;
use uuid::Uuid;

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

// --- website info ---

#[test]
fn website_info_is_decoded() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({
        "flux_version": "2.0.0-pr13",
        "version_update": {"update": true, "version": "2.0.0-pr14", "urgent": false},
        "modules": ["Core", "Forum"],
        "language": "EnglishUK"
    }));
    let api = api(&transport);

    let website = api.website().unwrap();
    assert_eq!(website.parsed_version().unwrap(), FluxVersion::V2_0_0Pr13);
    assert_eq!(website.modules, vec!["Core", "Forum"]);
    let update = website.update.unwrap();
    assert_eq!(update.version, "2.0.0-pr14");
    assert!(update.parsed_version().is_err());

    let request = &transport.requests()[0];
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url, "https://flux.example.com/api/v2/test-key/info");
}

// --- registration ---

#[test]
fn register_user_returns_link_and_sends_dashed_uuid() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({"link": "https://flux.example.com/complete_signup/?c=abc"}));
    let api = api(&transport);

    let uuid = Uuid::parse_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap();
    let link = api.register_user("Notch", "notch@example.com", Some(uuid)).unwrap();
    assert_eq!(link.as_deref(), Some("https://flux.example.com/complete_signup/?c=abc"));

    let request = &transport.requests()[0];
    assert_eq!(ScriptedTransport::path(request), "users/register");
    assert_eq!(
        ScriptedTransport::json_body(request),
        json!({"username": "Notch", "email": "notch@example.com", "uuid": "069a79f4-44e9-4726-a5be-fca90e38aaf5"})
    );
}

#[test]
fn register_user_without_link_when_email_is_sent() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({"message": "ok"}));
    let api = api(&transport);

    assert_eq!(api.register_user("Notch", "notch@example.com", None).unwrap(), None);
    let body = ScriptedTransport::json_body(&transport.requests()[0]);
    assert!(body.get("uuid").is_none());
}

#[test]
fn register_user_promotes_documented_codes() {
    let transport = ScriptedTransport::new();
    transport
        .reply(400, r#"{"error":11}"#)
        .reply(400, r#"{"error":8}"#)
        .reply(400, r#"{"error":12}"#)
        .reply(400, r#"{"error":14}"#)
        .reply(400, r#"{"error":10}"#);
    let api = api(&transport);

    let register = || api.register_user("Notch", "notch@example.com", None).unwrap_err();
    assert!(matches!(register(), RegisterError::UsernameAlreadyExists));
    assert!(matches!(register(), RegisterError::InvalidUsername));
    assert!(matches!(register(), RegisterError::UuidAlreadyExists));
    assert!(matches!(register(), RegisterError::CannotSendEmail));
    match register() {
        RegisterError::Other(err) => assert_eq!(err.kind(), Some(ErrorCode::EmailAlreadyExists)),
        other => panic!("expected a generic error, got {other:?}"),
    }
}

#[test]
fn documented_code_stays_generic_on_other_operations() {
    let transport = ScriptedTransport::new();
    transport.reply(400, r#"{"error":11,"meta":"dup"}"#);
    let api = api(&transport);

    let api_error = match api.all_groups().unwrap_err() {
        FluxError::Api(api_error) => api_error,
        other => panic!("expected an API error, got {other:?}"),
    };
    assert_eq!(api_error.code(), 11);
    assert_eq!(api_error.meta(), Some("dup"));
}

// --- filtered user list ---

#[test]
fn filter_builder_sends_one_request_with_all_filters() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({"users": [
        {"id": 1, "username": "Alpha", "banned": true, "groups": [{"id": 2, "name": "Admin"}]},
        {"id": 5, "username": "Beta", "banned": true}
    ]}));
    let api = api(&transport);

    let builder = api
        .registered_users()
        .with_filter(&BANNED, true)
        .with_filter(&GROUP_ID, 2);
    assert_eq!(transport.call_count(), 0);

    let users = builder.execute().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|user| user.is_resolved()));
    assert_eq!(users[1].username().unwrap(), "Beta");
    assert_eq!(users[0].groups().unwrap()[0].name, "Admin");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(ScriptedTransport::path(&requests[0]), "users");
    assert_eq!(
        ScriptedTransport::query(&requests[0]),
        pairs(&[("banned", "true"), ("group_id", "2")])
    );
}

#[test]
fn filter_builder_keeps_last_value_per_filter() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({"users": []}));
    let api = api(&transport);

    let custom = UserFilter::<String>::named("language");
    let users = api
        .registered_users()
        .with_filter(&VERIFIED, true)
        .with_filter(&VERIFIED, false)
        .with_filter(&custom, "EnglishUK".to_string())
        .execute()
        .unwrap();
    assert!(users.is_empty());
    assert_eq!(
        ScriptedTransport::query(&transport.requests()[0]),
        pairs(&[("language", "EnglishUK"), ("verified", "false")])
    );
}

#[test]
fn unfiltered_list_has_no_query_string() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({"users": []}));
    let api = api(&transport);

    api.registered_users().execute().unwrap();
    assert!(!transport.requests()[0].url.contains('?'));
}

// --- groups ---

#[test]
fn group_lookup_by_id() {
    let transport = ScriptedTransport::new();
    transport
        .reply_json(json!({"groups": [{"id": 2, "name": "Admin", "staff": true, "order": 1}]}))
        .reply_json(json!({"groups": []}));
    let api = api(&transport);

    let group = api.group(2).unwrap().unwrap();
    assert_eq!(group.name, "Admin");
    assert!(group.staff);
    assert!(api.group(77).unwrap().is_none());

    let requests = transport.requests();
    assert_eq!(ScriptedTransport::path(&requests[0]), "groups");
    assert_eq!(ScriptedTransport::query(&requests[0]), pairs(&[("id", "2")]));
}

#[test]
fn groups_by_name_and_all_ids() {
    let transport = ScriptedTransport::new();
    transport
        .reply_json(json!({"groups": [{"id": 3, "name": "Staff & Co"}]}))
        .reply_json(json!({"groups": [{"id": 1, "name": "Member"}, {"id": 2, "name": "Admin"}]}));
    let api = api(&transport);

    assert_eq!(api.groups_by_name("Staff & Co").unwrap()[0].id, 3);
    assert_eq!(api.all_group_ids().unwrap(), vec![1, 2]);

    let requests = transport.requests();
    assert!(requests[0].url.ends_with("groups?name=Staff+%26+Co"));
    assert!(requests[1].url.ends_with("/groups"));
}

// --- discord ---

#[test]
fn discord_bot_settings_are_sent_as_strings() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({"message": "ok"})).reply_json(json!({"message": "ok"}));
    let api = api(&transport);

    api.set_discord_guild_id(123456789012345678).unwrap();
    let bot_url = Url::parse("https://bot.example.com/").unwrap();
    api.set_discord_bot_settings(&bot_url, 1, "FluxBot", 2).unwrap();

    let requests = transport.requests();
    assert_eq!(ScriptedTransport::path(&requests[0]), "discord/update-bot-settings");
    assert_eq!(
        ScriptedTransport::json_body(&requests[0]),
        json!({"guild_id": "123456789012345678"})
    );
    assert_eq!(
        ScriptedTransport::json_body(&requests[1]),
        json!({"url": "https://bot.example.com/", "guild_id": "1", "bot_username": "FluxBot", "bot_user_id": "2"})
    );
}

#[test]
fn discord_role_list_and_usernames() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({})).reply_json(json!({}));
    let api = api(&transport);

    let roles = BTreeMap::from([(20, "Member".to_string()), (10, "Admin".to_string())]);
    api.submit_discord_role_list(&roles).unwrap();
    api.update_discord_usernames(&[(5, "alpha"), (6, "beta")]).unwrap();

    let requests = transport.requests();
    assert_eq!(
        ScriptedTransport::json_body(&requests[0]),
        json!({"roles": [{"id": 10, "name": "Admin"}, {"id": 20, "name": "Member"}]})
    );
    assert_eq!(ScriptedTransport::path(&requests[1]), "discord/update-usernames");
    assert_eq!(
        ScriptedTransport::json_body(&requests[1]),
        json!({"users": [{"id": 5, "name": "alpha"}, {"id": 6, "name": "beta"}]})
    );
}

#[test]
fn empty_discord_username_batch_sends_nothing() {
    let transport = ScriptedTransport::new();
    let api = api(&transport);

    api.update_discord_usernames(&[]).unwrap();
    assert_eq!(transport.call_count(), 0);
}

// --- integrations ---

#[test]
fn verify_minecraft_promotes_invalid_code() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({})).reply(400, r#"{"error":28}"#);
    let api = api(&transport);

    let uuid = Uuid::parse_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap();
    api.verify_minecraft("ABC123", uuid, "Notch").unwrap();
    assert!(matches!(
        api.verify_discord("nope", 42, "notch").unwrap_err(),
        VerifyError::InvalidValidateCode
    ));

    let requests = transport.requests();
    assert_eq!(
        ScriptedTransport::json_body(&requests[0]),
        json!({"integration": "Minecraft", "code": "ABC123", "identifier": "069a79f4-44e9-4726-a5be-fca90e38aaf5", "username": "Notch"})
    );
    assert_eq!(ScriptedTransport::json_body(&requests[1])["integration"], "Discord");
    assert_eq!(ScriptedTransport::json_body(&requests[1])["identifier"], "42");
}

// --- user actions ---

#[test]
fn report_between_two_lazy_users() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({})).reply(400, r#"{"error":26}"#);
    let api = api(&transport);

    let reporter = api.user_lazy(1);
    let reported = api.user_lazy(2);
    reporter.create_report(&reported, "griefing").unwrap();
    assert!(matches!(
        reporter.create_report(&reporter, "me").unwrap_err(),
        ReportError::CannotReportSelf
    ));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        ScriptedTransport::json_body(&requests[0]),
        json!({"reporter": 1, "reported": 2, "content": "griefing"})
    );
}

#[test]
fn report_lookup_errors_are_not_promoted() {
    let transport = ScriptedTransport::new();
    transport.reply(400, r#"{"error":21}"#);
    let api = api(&transport);

    let reporter = api.user_lazy_by_username("Griefer").unwrap();
    let err = reporter.create_report(&api.user_lazy(1), "spam").unwrap_err();
    match err {
        ReportError::Other(err) => assert_eq!(err.kind(), Some(ErrorCode::UserCreatingReportBanned)),
        other => panic!("lookup error was promoted: {other:?}"),
    }

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(ScriptedTransport::path(&requests[0]), "users/username:Griefer");
}

#[test]
fn activate_and_set_discord_id_use_the_user_path() {
    let transport = ScriptedTransport::new();
    transport.reply_json(json!({})).reply_json(json!({}));
    let api = api(&transport);

    let user = api.user_lazy_by_username("Notch").unwrap();
    user.activate().unwrap();
    user.set_discord_id(99).unwrap();

    let requests = transport.requests();
    assert_eq!(ScriptedTransport::path(&requests[0]), "users/username:Notch/verify");
    assert_eq!(ScriptedTransport::path(&requests[1]), "users/username:Notch/update-discord-id");
    assert_eq!(ScriptedTransport::json_body(&requests[1]), json!({"discord_id": 99}));
}

// --- websend ---

#[test]
fn websend_commands_and_console() {
    let transport = ScriptedTransport::new();
    transport
        .reply_json(json!({"commands": [{"id": 1, "command": "say hi"}]}))
        .reply_json(json!({}));
    let api = api(&transport);

    let commands = api.websend().commands(4).unwrap();
    assert_eq!(commands[0].command_line, "say hi");
    api.websend().send_console_log(4, ["[INFO] started"]).unwrap();

    let requests = transport.requests();
    assert_eq!(ScriptedTransport::query(&requests[0]), pairs(&[("server_id", "4")]));
    assert_eq!(
        ScriptedTransport::json_body(&requests[1]),
        json!({"server_id": 4, "content": ["[INFO] started"]})
    );
}
