//! Request-level tests for `AccountHandler`, driven without any sockets.
//!
//! Each test feeds decoded requests for one or more connection ids and
//! inspects the deliveries the handler queued.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use realmgate::account::MAX_CHARACTERS;
use realmgate::prelude::*;
use realmgate_rendezvous::Registration;
use realmgate_session::SessionStatus;

// =========================================================================
// Helpers
// =========================================================================

const TIMEOUT: Duration = Duration::from_secs(30);

type Handler = AccountHandler<MemoryStorage, MapTable>;

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

fn character(name: &str, map: MapId) -> Character {
    Character {
        name: name.into(),
        gender: 0,
        hair_style: 1,
        hair_color: 2,
        level: 3,
        experience: 300,
        correction_points: 0,
        money: 100,
        attributes: [10; 6],
        map,
        position: Position::new(512, 512),
    }
}

/// "alice" / "secret" with a character on map 1 (hosted) and one on map 2
/// (not hosted).
fn handler_with(config: AccountConfig) -> (Handler, AccountId) {
    let mut storage = MemoryStorage::new();
    let mut alice = Account::new("alice", "secret", "alice@example.net");
    alice.characters.push(character("Hosted", MapId(1)));
    alice.characters.push(character("Stranded", MapId(2)));
    let alice = storage.add_account(alice).unwrap();

    let maps = MapTable::new().with_map(MapId(1), ServerAddress::new("game1", 9604));
    let handler = AccountHandler::new(
        config,
        RendezvousConfig::with_timeout(TIMEOUT),
        storage,
        maps,
    );
    (handler, alice)
}

fn handler() -> (Handler, AccountId) {
    handler_with(AccountConfig::default())
}

fn connected(h: &mut Handler, id: u64) -> ConnectionId {
    let c = conn(id);
    h.connect(c).unwrap();
    c
}

/// Everything queued for `c` since the last call. Deliveries for other
/// connections are dropped.
fn replies(h: &mut Handler, c: ConnectionId) -> Vec<ServerMessage> {
    h.take_deliveries()
        .into_iter()
        .filter_map(|d| match d {
            Delivery::Send {
                connection,
                message,
            } if connection == c => Some(message),
            _ => None,
        })
        .collect()
}

fn login(username: &str, password: &str) -> ClientRequest {
    ClientRequest::Login {
        client_version: 1,
        username: username.into(),
        password: password.into(),
    }
}

fn logged_in(h: &mut Handler, id: u64) -> ConnectionId {
    let c = connected(h, id);
    h.handle(c, login("alice", "secret"));
    h.take_deliveries();
    c
}

fn create(name: &str, attributes: [u16; 6]) -> ClientRequest {
    ClientRequest::CharacterCreate {
        name: name.into(),
        hair_style: 1,
        hair_color: 1,
        gender: 1,
        attributes,
    }
}

fn past_timeout() -> Instant {
    Instant::now() + TIMEOUT + Duration::from_millis(1)
}

// =========================================================================
// Login
// =========================================================================

#[test]
fn test_login_success_sends_ok_then_characters() {
    let (mut h, alice) = handler();
    let c = connected(&mut h, 1);

    h.handle(c, login("alice", "secret"));

    let msgs = replies(&mut h, c);
    assert_eq!(msgs[0], ServerMessage::LoginResponse { status: StatusCode::Ok });
    assert_eq!(msgs.len(), 3);
    assert!(matches!(&msgs[2], ServerMessage::CharacterInfo { character } if character.slot == 1));
    assert_eq!(h.sessions().account_of(c), Some(alice));
    assert!(h.storage().find_account_by_id(alice).unwrap().last_login.is_some());
}

#[test]
fn test_login_wrong_password_is_invalid_argument() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);

    h.handle(c, login("alice", "nope"));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::LoginResponse { status: StatusCode::InvalidArgument }]
    );
    assert_eq!(h.sessions().status(c), Some(SessionStatus::Unauthenticated));
}

#[test]
fn test_login_with_quote_in_name_is_invalid_argument() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);

    h.handle(c, login("ali\"ce", "secret"));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::LoginResponse { status: StatusCode::InvalidArgument }]
    );
}

#[test]
fn test_login_old_client_is_invalid_version() {
    let (mut h, _) = handler_with(AccountConfig {
        min_client_version: 5,
        ..AccountConfig::default()
    });
    let c = connected(&mut h, 1);

    h.handle(c, login("alice", "secret"));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::LoginResponse { status: StatusCode::InvalidVersion }]
    );
}

#[test]
fn test_login_twice_is_failure() {
    let (mut h, _) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, login("alice", "secret"));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::LoginResponse { status: StatusCode::Failure }]
    );
}

#[test]
fn test_login_beyond_max_clients_is_server_full() {
    let (mut h, _) = handler_with(AccountConfig {
        max_clients: 1,
        ..AccountConfig::default()
    });
    logged_in(&mut h, 1);
    let second = connected(&mut h, 2);

    h.handle(second, login("alice", "secret"));

    assert_eq!(
        replies(&mut h, second),
        vec![ServerMessage::LoginResponse { status: StatusCode::ServerFull }]
    );
}

#[test]
fn test_login_banned_account_is_refused() {
    let (mut h, alice) = handler();
    let mut account = h.storage().find_account_by_id(alice).unwrap();
    account.level = AccessLevel::Banned;
    h.storage_mut().persist(&account).unwrap();
    let c = connected(&mut h, 1);

    h.handle(c, login("alice", "secret"));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::LoginResponse { status: StatusCode::Banned }]
    );
}

// =========================================================================
// Logout
// =========================================================================

#[test]
fn test_logout_when_not_logged_in_is_no_login() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);

    h.handle(c, ClientRequest::Logout);

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::LogoutResponse { status: StatusCode::NoLogin }]
    );
}

#[test]
fn test_logout_after_login_is_ok() {
    let (mut h, _) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::Logout);

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::LogoutResponse { status: StatusCode::Ok }]
    );
    assert_eq!(h.sessions().account_of(c), None);
}

#[test]
fn test_logout_while_waiting_cancels_claim() {
    let (mut h, alice) = handler();
    let c = connected(&mut h, 1);
    h.handle(c, ClientRequest::Reconnect { token: "abc123".into() });

    h.handle(c, ClientRequest::Logout);
    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::LogoutResponse { status: StatusCode::Ok }]
    );

    // The withdrawn claim can no longer be matched.
    assert_eq!(h.expect_reconnect("abc123", alice), Registration::Pending);
    assert_eq!(h.sessions().account_of(c), None);
}

// =========================================================================
// Reconnect (handoff redemption)
// =========================================================================

#[test]
fn test_reconnect_without_announcement_waits_silently() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);

    h.handle(c, ClientRequest::Reconnect { token: "abc123".into() });

    assert!(replies(&mut h, c).is_empty());
    assert_eq!(h.sessions().status(c), Some(SessionStatus::AwaitingToken));
}

#[test]
fn test_announcement_completes_waiting_reconnect() {
    let (mut h, alice) = handler();
    let c = connected(&mut h, 1);
    h.handle(c, ClientRequest::Reconnect { token: "abc123".into() });

    assert_eq!(h.expect_reconnect("abc123", alice), Registration::Matched);

    let msgs = replies(&mut h, c);
    assert_eq!(msgs[0], ServerMessage::ReconnectResponse { status: StatusCode::Ok });
    let responses = msgs
        .iter()
        .filter(|m| matches!(m, ServerMessage::ReconnectResponse { .. }))
        .count();
    assert_eq!(responses, 1);
    assert_eq!(h.sessions().account_of(c), Some(alice));
}

#[test]
fn test_reconnect_after_announcement_matches_immediately() {
    let (mut h, alice) = handler();
    h.expect_reconnect("tok", alice);
    let c = connected(&mut h, 1);

    h.handle(c, ClientRequest::Reconnect { token: "tok".into() });

    assert_eq!(
        replies(&mut h, c)[0],
        ServerMessage::ReconnectResponse { status: StatusCode::Ok }
    );
    assert_eq!(h.sessions().account_of(c), Some(alice));
}

#[test]
fn test_reconnect_while_logged_in_is_ignored() {
    let (mut h, alice) = handler();
    h.expect_reconnect("tok", alice);
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::Reconnect { token: "tok".into() });

    assert!(replies(&mut h, c).is_empty());
    assert!(h.sessions().rendezvous().contains("tok"));
}

#[test]
fn test_stale_reconnect_times_out_and_disconnects() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);
    h.handle(c, ClientRequest::Reconnect { token: "xyz".into() });

    assert_eq!(h.sweep(past_timeout()), 1);

    let deliveries = h.take_deliveries();
    assert_eq!(
        deliveries,
        vec![
            Delivery::Send { connection: c, message: ServerMessage::ConnectionTimedOut },
            Delivery::Disconnect { connection: c, reason: "reconnect token timed out".into() },
        ]
    );
    assert!(!h.sessions().rendezvous().contains("xyz"));
    assert_eq!(h.sessions().status(c), Some(SessionStatus::Unauthenticated));
}

#[test]
fn test_disconnect_while_waiting_leaves_nothing_behind() {
    let (mut h, alice) = handler();
    let c = connected(&mut h, 1);
    h.handle(c, ClientRequest::Reconnect { token: "abc123".into() });

    h.disconnect(c);

    assert!(h.sessions().is_empty());
    assert!(h.sessions().rendezvous().is_empty());
    assert_eq!(h.expect_reconnect("abc123", alice), Registration::Pending);
    assert!(h.take_deliveries().is_empty());
}

// =========================================================================
// Register / Unregister
// =========================================================================

fn register(username: &str, password: &str, email: &str) -> ClientRequest {
    ClientRequest::Register {
        client_version: 1,
        username: username.into(),
        password: password.into(),
        email: email.into(),
    }
}

#[test]
fn test_register_logs_the_new_account_in() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);

    h.handle(c, register("bobby", "hunter22", "bob@example.net"));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::RegisterResponse { status: StatusCode::Ok }]
    );
    let bob = h.storage().find_account_by_name("bobby").unwrap();
    assert_eq!(h.sessions().account_of(c), Some(bob.id));
    assert!(bob.check_password("hunter22"));
}

#[test]
fn test_register_stamps_registration_time() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);
    let before = SystemTime::now();

    h.handle(c, register("bobby", "hunter22", "bob@example.net"));

    let bob = h.storage().find_account_by_name("bobby").unwrap();
    assert!(bob.registered_at >= before);
    assert!(bob.registered_at <= SystemTime::now());
}

#[test]
fn test_register_rejections() {
    let cases = [
        (register("bob", "hunter22", "bob@example.net"), StatusCode::InvalidArgument),
        (register("bobby", "abc", "bob@example.net"), StatusCode::InvalidArgument),
        (register("bobby", "hunter22", "not-an-email"), StatusCode::InvalidArgument),
        (register("bo\"by", "hunter22", "bob@example.net"), StatusCode::InvalidArgument),
        (register("alice", "hunter22", "bob@example.net"), StatusCode::UsernameTaken),
        (register("bobby", "hunter22", "alice@example.net"), StatusCode::EmailTaken),
    ];

    for (request, expected) in cases {
        let (mut h, _) = handler();
        let c = connected(&mut h, 1);
        h.handle(c, request);
        assert_eq!(
            replies(&mut h, c),
            vec![ServerMessage::RegisterResponse { status: expected }]
        );
    }
}

#[test]
fn test_register_while_logged_in_is_failure() {
    let (mut h, _) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, register("bobby", "hunter22", "bob@example.net"));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::RegisterResponse { status: StatusCode::Failure }]
    );
}

#[test]
fn test_unregister_deletes_account() {
    let (mut h, alice) = handler();
    let c = connected(&mut h, 1);

    h.handle(
        c,
        ClientRequest::Unregister { username: "alice".into(), password: "secret".into() },
    );

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::UnregisterResponse { status: StatusCode::Ok }]
    );
    assert!(h.storage().find_account_by_id(alice).is_none());
}

#[test]
fn test_unregister_with_bad_password_keeps_account() {
    let (mut h, alice) = handler();
    let c = connected(&mut h, 1);

    h.handle(
        c,
        ClientRequest::Unregister { username: "alice".into(), password: "wrong".into() },
    );

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::UnregisterResponse { status: StatusCode::InvalidArgument }]
    );
    assert!(h.storage().find_account_by_id(alice).is_some());
}

#[test]
fn test_session_of_deleted_account_loses_access() {
    let (mut h, _) = handler();
    let c = logged_in(&mut h, 1);
    let other = connected(&mut h, 2);
    h.handle(
        other,
        ClientRequest::Unregister { username: "alice".into(), password: "secret".into() },
    );
    h.take_deliveries();

    h.handle(c, ClientRequest::EmailGet);

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::EmailGetResponse { status: StatusCode::NoLogin, email: None }]
    );
}

// =========================================================================
// Email / password
// =========================================================================

#[test]
fn test_email_change_and_get() {
    let (mut h, _) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::EmailChange { email: "new@example.net".into() });
    h.handle(c, ClientRequest::EmailGet);

    assert_eq!(
        replies(&mut h, c),
        vec![
            ServerMessage::EmailChangeResponse { status: StatusCode::Ok },
            ServerMessage::EmailGetResponse {
                status: StatusCode::Ok,
                email: Some(realmgate::account::digest("new@example.net")),
            },
        ]
    );
}

#[test]
fn test_email_change_rejections() {
    let (mut h, _) = handler();
    let anonymous = connected(&mut h, 1);
    let c = logged_in(&mut h, 2);

    h.handle(anonymous, ClientRequest::EmailChange { email: "x@example.net".into() });
    assert_eq!(
        replies(&mut h, anonymous),
        vec![ServerMessage::EmailChangeResponse { status: StatusCode::NoLogin }]
    );

    h.handle(c, ClientRequest::EmailChange { email: "broken".into() });
    h.handle(c, ClientRequest::EmailChange { email: "alice@example.net".into() });
    assert_eq!(
        replies(&mut h, c),
        vec![
            ServerMessage::EmailChangeResponse { status: StatusCode::InvalidArgument },
            ServerMessage::EmailChangeResponse { status: StatusCode::EmailTaken },
        ]
    );
}

#[test]
fn test_password_change() {
    let (mut h, alice) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(
        c,
        ClientRequest::PasswordChange { old_password: "wrong".into(), new_password: "fresh123".into() },
    );
    h.handle(
        c,
        ClientRequest::PasswordChange { old_password: "secret".into(), new_password: "no".into() },
    );
    h.handle(
        c,
        ClientRequest::PasswordChange { old_password: "secret".into(), new_password: "fresh123".into() },
    );

    assert_eq!(
        replies(&mut h, c),
        vec![
            ServerMessage::PasswordChangeResponse { status: StatusCode::Failure },
            ServerMessage::PasswordChangeResponse { status: StatusCode::InvalidArgument },
            ServerMessage::PasswordChangeResponse { status: StatusCode::Ok },
        ]
    );
    assert!(h.storage().find_account_by_id(alice).unwrap().check_password("fresh123"));
}

// =========================================================================
// Characters
// =========================================================================

#[test]
fn test_character_create_places_character_at_start() {
    let (mut h, alice) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, create("Newcomer", [10; 6]));

    let msgs = replies(&mut h, c);
    assert_eq!(msgs[0], ServerMessage::CharacterCreateResponse { status: StatusCode::Ok });
    assert!(matches!(
        &msgs[1],
        ServerMessage::CharacterInfo { character } if character.slot == 2 && character.level == 1
    ));

    let stored = h.storage().find_account_by_id(alice).unwrap();
    let created = &stored.characters[2];
    assert_eq!(created.map, h.config().default_map);
    assert_eq!(created.position, h.config().start_position);
    assert_eq!(created.money, 0);
}

#[test]
fn test_character_create_rejections() {
    let cases = [
        (create("Hosted", [10; 6]), StatusCode::NameTaken),
        (create("Abc", [10; 6]), StatusCode::InvalidArgument),
        (create("Quo\"ted", [10; 6]), StatusCode::InvalidArgument),
        (create("Greedy", [20; 6]), StatusCode::AttributesTooHigh),
        (create("Modest", [5; 6]), StatusCode::AttributesTooLow),
        (create("Lopsided", [0, 12, 12, 12, 12, 12]), StatusCode::AttributeZero),
        (
            ClientRequest::CharacterCreate {
                name: "Stylish".into(),
                hair_style: 8,
                hair_color: 0,
                gender: 0,
                attributes: [10; 6],
            },
            StatusCode::InvalidHairStyle,
        ),
        (
            ClientRequest::CharacterCreate {
                name: "Colorful".into(),
                hair_style: 0,
                hair_color: 12,
                gender: 0,
                attributes: [10; 6],
            },
            StatusCode::InvalidHairColor,
        ),
        (
            ClientRequest::CharacterCreate {
                name: "Neither".into(),
                hair_style: 0,
                hair_color: 0,
                gender: 2,
                attributes: [10; 6],
            },
            StatusCode::InvalidGender,
        ),
    ];

    for (request, expected) in cases {
        let (mut h, _) = handler();
        let c = logged_in(&mut h, 1);
        h.handle(c, request);
        assert_eq!(
            replies(&mut h, c),
            vec![ServerMessage::CharacterCreateResponse { status: expected }],
            "expected {expected:?}"
        );
    }
}

#[test]
fn test_character_create_limit() {
    let (mut h, _) = handler();
    let c = logged_in(&mut h, 1);
    for i in 0..(MAX_CHARACTERS - 2) {
        h.handle(c, create(&format!("Filler{i}"), [10; 6]));
    }
    h.take_deliveries();

    h.handle(c, create("OneTooMany", [10; 6]));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::CharacterCreateResponse { status: StatusCode::TooManyCharacters }]
    );
}

#[test]
fn test_character_create_requires_login() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);

    h.handle(c, create("Newcomer", [10; 6]));

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::CharacterCreateResponse { status: StatusCode::NoLogin }]
    );
}

#[test]
fn test_character_delete() {
    let (mut h, alice) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::CharacterDelete { slot: 7 });
    h.handle(c, ClientRequest::CharacterDelete { slot: 0 });

    assert_eq!(
        replies(&mut h, c),
        vec![
            ServerMessage::CharacterDeleteResponse { status: StatusCode::InvalidArgument },
            ServerMessage::CharacterDeleteResponse { status: StatusCode::Ok },
        ]
    );
    let remaining = h.storage().characters(alice).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Stranded");
}

// =========================================================================
// Character select (handoff issuance)
// =========================================================================

fn ticket_of(msgs: &[ServerMessage]) -> Option<HandoffTicket> {
    msgs.iter().find_map(|m| match m {
        ServerMessage::CharacterSelectResponse { ticket, .. } => ticket.clone(),
        _ => None,
    })
}

#[test]
fn test_character_select_returns_ticket() {
    let (mut h, _) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::CharacterSelect { slot: 0 });

    let msgs = replies(&mut h, c);
    assert!(matches!(
        msgs[0],
        ServerMessage::CharacterSelectResponse { status: StatusCode::Ok, .. }
    ));
    let ticket = ticket_of(&msgs).unwrap();
    assert_eq!(ticket.game_server, ServerAddress::new("game1", 9604));
    assert_eq!(ticket.chat_server, h.config().chat_server);
    assert_eq!(ticket.token.len(), 32);
}

#[test]
fn test_character_select_without_game_server_keeps_session() {
    let (mut h, alice) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::CharacterSelect { slot: 1 });

    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::CharacterSelectResponse { status: StatusCode::Failure, ticket: None }]
    );
    assert_eq!(h.sessions().account_of(c), Some(alice));
    assert!(h.sessions().rendezvous().is_empty());
}

#[test]
fn test_character_select_bad_slot_and_no_login() {
    let (mut h, _) = handler();
    let anonymous = connected(&mut h, 1);
    let c = logged_in(&mut h, 2);

    h.handle(anonymous, ClientRequest::CharacterSelect { slot: 0 });
    assert_eq!(
        replies(&mut h, anonymous),
        vec![ServerMessage::CharacterSelectResponse { status: StatusCode::NoLogin, ticket: None }]
    );

    h.handle(c, ClientRequest::CharacterSelect { slot: 9 });
    assert_eq!(
        replies(&mut h, c),
        vec![ServerMessage::CharacterSelectResponse {
            status: StatusCode::InvalidArgument,
            ticket: None
        }]
    );
}

#[test]
fn test_character_select_announces_to_game_and_chat() {
    let (h, _) = handler();
    let recorder = Arc::new(RecordingAnnouncer::new());
    let mut h = h.with_announcer(recorder.clone());
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::CharacterSelect { slot: 0 });
    let ticket = ticket_of(&replies(&mut h, c)).unwrap();

    let announced = recorder.announcements();
    let game: Vec<_> = announced
        .iter()
        .filter(|a| matches!(a, Announcement::Game { .. }))
        .collect();
    let chat: Vec<_> = announced
        .iter()
        .filter(|a| matches!(a, Announcement::Chat { .. }))
        .collect();
    assert_eq!(game.len(), 1);
    assert_eq!(chat.len(), 1);
    assert!(announced.iter().all(|a| a.token() == ticket.token));
    assert_eq!(
        chat[0],
        &Announcement::Chat {
            token: ticket.token.clone(),
            name: "Hosted".into(),
            level: AccessLevel::Normal,
        }
    );
}

#[test]
fn test_failed_character_select_announces_nothing() {
    let (h, _) = handler();
    let recorder = Arc::new(RecordingAnnouncer::new());
    let mut h = h.with_announcer(recorder.clone());
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::CharacterSelect { slot: 1 });
    h.handle(c, ClientRequest::CharacterSelect { slot: 9 });

    assert!(recorder.announcements().is_empty());
}

#[test]
fn test_back_to_back_selects_issue_distinct_tokens() {
    let (mut h, _) = handler();
    let c = logged_in(&mut h, 1);

    h.handle(c, ClientRequest::CharacterSelect { slot: 0 });
    let first = ticket_of(&replies(&mut h, c)).unwrap();
    h.handle(c, ClientRequest::CharacterSelect { slot: 0 });
    let second = ticket_of(&replies(&mut h, c)).unwrap();

    assert_ne!(first.token, second.token);
}

#[test]
fn test_ticket_redeems_on_a_fresh_connection() {
    let (mut h, alice) = handler();
    let c = logged_in(&mut h, 1);
    h.handle(c, ClientRequest::CharacterSelect { slot: 0 });
    let ticket = ticket_of(&replies(&mut h, c)).unwrap();
    let fresh = connected(&mut h, 2);

    h.handle(fresh, ClientRequest::Reconnect { token: ticket.token.clone() });

    assert_eq!(
        replies(&mut h, fresh)[0],
        ServerMessage::ReconnectResponse { status: StatusCode::Ok }
    );
    assert_eq!(h.sessions().account_of(fresh), Some(alice));

    // One-shot: a second redemption just waits.
    let late = connected(&mut h, 3);
    h.handle(late, ClientRequest::Reconnect { token: ticket.token });
    assert!(replies(&mut h, late).is_empty());
    assert_eq!(h.sessions().status(late), Some(SessionStatus::AwaitingToken));
}

// =========================================================================
// Misc
// =========================================================================

#[test]
fn test_invalid_frame_gets_invalid_reply() {
    let (mut h, _) = handler();
    let c = connected(&mut h, 1);

    h.handle_invalid(c);

    assert_eq!(replies(&mut h, c), vec![ServerMessage::Invalid]);
}

#[test]
fn test_connect_twice_is_an_error() {
    let (mut h, _) = handler();
    connected(&mut h, 1);

    assert!(h.connect(conn(1)).is_err());
}
