//! Session, cooldown and local statistics flows through a wired `PilotApp`.

use assert_matches::assert_matches;
use pilot_app::{AppError, ErrorCategory, LogoutStep, PlayRecord};
use pilot_core::effects::{storage_keys, StorageEffects, StorageExt};
use pilot_core::{GameEligibility, PilotError, UserRecord};
use pilot_testkit::TestApp;
use std::time::Duration;

fn ada() -> UserRecord {
    UserRecord::new(7, "Ada", "ada@example.com")
}

#[tokio::test]
async fn session_survives_restart() {
    let mut harness = TestApp::builder().build().unwrap();
    harness.app.session().set_auth("tok-1", ada()).await.unwrap();

    harness.restart().unwrap();
    assert!(!harness.app.session().is_authenticated());
    assert!(harness.app.start().await);
    assert_eq!(harness.app.session().token().as_deref(), Some("tok-1"));
    assert_eq!(harness.app.session().user(), Some(ada()));
}

#[tokio::test]
async fn offline_logout_still_clears_local_state() {
    let harness = TestApp::builder().build().unwrap();
    harness.backend.set_auth_payload("tok-1", ada());
    harness.app.session().set_push_token("push-abc").await.unwrap();
    harness.app.login("ada@example.com", "hunter2").await.unwrap();
    assert_eq!(harness.backend.registered_device_tokens(), vec!["push-abc"]);

    harness.backend.set_offline(true);
    harness.identity.set_failing(true);
    let report = harness.app.logout().await;

    assert_eq!(
        report.failed,
        vec![
            LogoutStep::DeviceToken,
            LogoutStep::Backend,
            LogoutStep::IdentityProvider
        ]
    );
    assert!(!harness.app.session().is_authenticated());
    assert!(!harness.storage.exists(storage_keys::AUTH_TOKEN).await.unwrap());
    assert!(!harness.storage.exists(storage_keys::USER_DATA).await.unwrap());
    // The push token belongs to the device and stays.
    assert!(harness.storage.exists(storage_keys::FCM_TOKEN).await.unwrap());
}

#[tokio::test]
async fn clean_logout_deactivates_push_token() {
    let harness = TestApp::builder().build().unwrap();
    harness.backend.set_auth_payload("tok-1", ada());
    harness.app.session().set_push_token("push-abc").await.unwrap();
    harness.app.login("ada@example.com", "hunter2").await.unwrap();

    let report = harness.app.logout().await;
    assert!(report.is_clean());
    assert_eq!(harness.backend.deactivated_device_tokens(), vec!["push-abc"]);
    assert_eq!(harness.backend.calls().logout, 1);
    assert_eq!(harness.identity.sign_out_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn google_sign_in_times_out() {
    let harness = TestApp::builder().build().unwrap();
    harness.backend.set_auth_payload("tok-1", ada());
    harness.backend.set_google_delay(Duration::from_secs(31));

    let err = harness
        .app
        .sign_in_with_google("google-id-token")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("network timeout after 30s"));
    let app_err = AppError::from(err);
    assert_eq!(app_err.category(), ErrorCategory::Network);
    assert!(!harness.app.session().is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn google_sign_in_within_timeout_succeeds() {
    let harness = TestApp::builder().build().unwrap();
    harness.backend.set_auth_payload("tok-g", ada());
    harness.backend.set_google_delay(Duration::from_secs(5));

    let user = harness
        .app
        .sign_in_with_google("google-id-token")
        .await
        .unwrap();
    assert_eq!(user.id, 7);
    assert_eq!(harness.app.session().token().as_deref(), Some("tok-g"));
}

#[tokio::test]
async fn wrong_credentials_surface_backend_message() {
    let harness = TestApp::builder().build().unwrap();
    let err = harness
        .app
        .login("ada@example.com", "nope")
        .await
        .unwrap_err();
    let app_err = AppError::from(err);
    assert_eq!(app_err.category(), ErrorCategory::Validation);
    assert_eq!(app_err.user_message(), "Invalid credentials");
}

#[tokio::test]
async fn rejected_token_on_profile_refresh_clears_session() {
    let harness = TestApp::builder().build().unwrap();
    harness.app.session().set_auth("tok-1", ada()).await.unwrap();
    harness.backend.set_reject_token(true);

    let err = harness.app.session().refresh_profile().await.unwrap_err();
    assert_matches!(AppError::from(err), AppError::Auth { .. });
    assert!(!harness.app.session().is_authenticated());
    assert!(!harness.storage.exists(storage_keys::AUTH_TOKEN).await.unwrap());
}

#[tokio::test]
async fn profile_refresh_persists_new_record() {
    let harness = TestApp::builder().build().unwrap();
    harness.app.session().set_auth("tok-1", ada()).await.unwrap();
    let mut richer = ada();
    richer.points = 1_250;
    harness.backend.set_profile(richer.clone());

    assert_eq!(harness.app.session().refresh_profile().await.unwrap(), richer);
    assert_eq!(harness.app.session().user(), Some(richer));
}

#[tokio::test]
async fn cooldown_counts_down_from_cache() {
    let harness = TestApp::builder().build().unwrap();
    harness.backend.set_eligibility(
        "math-quiz",
        GameEligibility {
            can_play: false,
            remaining_seconds: 40,
        },
    );
    let cooldowns = harness.app.cooldowns();

    assert_eq!(cooldowns.check_game_cooldown(7, "math-quiz").await, 40);
    harness.time.advance_ms(2_000);
    assert_eq!(cooldowns.check_game_cooldown(7, "math-quiz").await, 38);
    assert_eq!(harness.backend.calls().check_game_eligibility, 1);

    harness.time.advance_ms(8_000);
    assert_eq!(cooldowns.check_game_cooldown(7, "math-quiz").await, 40);
    assert_eq!(harness.backend.calls().check_game_eligibility, 2);
}

#[tokio::test]
async fn offline_cooldown_check_allows_play() {
    let harness = TestApp::builder().build().unwrap();
    harness.backend.set_offline(true);
    assert_eq!(harness.app.cooldowns().check_game_cooldown(7, "math-quiz").await, 0);
    assert!(harness.app.cooldowns().get_cooldown("math-quiz").is_none());
}

#[tokio::test]
async fn recorded_play_seeds_cooldown_and_stats() {
    let harness = TestApp::builder().build().unwrap();
    let stats = harness.app.game_stats();

    stats
        .record_play(PlayRecord {
            game_id: 3,
            game_slug: "word-hunt",
            score: 120,
            cooldown_seconds: Some(300),
        })
        .await
        .unwrap();
    let second = stats
        .record_play(PlayRecord {
            game_id: 3,
            game_slug: "word-hunt",
            score: 80,
            cooldown_seconds: None,
        })
        .await
        .unwrap();

    assert_eq!(second.plays, 2);
    assert_eq!(second.best_score, 120);
    assert_eq!(second.last_score, 80);
    assert_eq!(
        harness.app.cooldowns().check_game_cooldown(3, "word-hunt").await,
        300
    );
    assert_eq!(harness.backend.calls().check_game_eligibility, 0);
    assert_eq!(
        stats.last_play_times().await.get("word-hunt"),
        Some(&harness.time.now_ms())
    );
}

#[tokio::test]
async fn logout_clears_local_game_stats() {
    let harness = TestApp::builder().build().unwrap();
    harness.app.session().set_auth("tok-1", ada()).await.unwrap();
    harness
        .app
        .game_stats()
        .record_play(PlayRecord {
            game_id: 3,
            game_slug: "word-hunt",
            score: 10,
            cooldown_seconds: None,
        })
        .await
        .unwrap();
    harness
        .storage
        .store_str(storage_keys::USER_GAME_STATS, "{\"7\":{\"plays\":1}}")
        .await
        .unwrap();

    harness.app.logout().await;
    assert!(harness.app.game_stats().stats().await.is_empty());
    assert!(!harness.storage.exists(storage_keys::GAME_STATS).await.unwrap());
    assert!(!harness
        .storage
        .exists(storage_keys::USER_GAME_STATS)
        .await
        .unwrap());
}

#[tokio::test]
async fn empty_token_is_rejected() {
    let harness = TestApp::builder().build().unwrap();
    let err = harness.app.session().set_auth("  ", ada()).await.unwrap_err();
    assert_matches!(err, PilotError::Invalid { .. });
    assert!(!harness.app.session().is_authenticated());
}
