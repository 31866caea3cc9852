/// End-to-end capture tests: events in, rows in a real SQLite store out.

use std::sync::Arc;
use std::time::Duration;

use chatlog_capture::{CaptureConfig, CaptureOutcome, CaptureService, SkipReason};
use chatlog_db::{InitError, StoreError, StoreStatus};
use chatlog_types::events::{AdapterInfo, BotResponse, GroupMessage, LauncherType};
use chatlog_types::message::MessageChain;
use serde_json::json;

fn memory_config() -> CaptureConfig {
    CaptureConfig {
        database_url: "sqlite::memory:".into(),
        ..CaptureConfig::default()
    }
}

async fn started(config: CaptureConfig) -> CaptureService {
    let service = CaptureService::new(config);
    service.initialize().await.unwrap();
    service
}

fn alice_says(group: &str, chain: MessageChain) -> GroupMessage {
    GroupMessage {
        launcher_id: group.into(),
        sender_id: "u1".into(),
        sender_name: Some("Alice".into()),
        message_chain: chain,
        ..GroupMessage::default()
    }
}

fn bot_reply(launcher_type: LauncherType) -> BotResponse {
    BotResponse {
        launcher_type,
        launcher_id: "g1".into(),
        prefix: Some("[bot] ".into()),
        response_text: Some("hi".into()),
        adapter: None,
    }
}

#[tokio::test]
async fn group_message_is_recorded() {
    let service = started(memory_config()).await;

    let outcome = service.on_group_message(alice_says("g1", "hello".into())).await;
    assert!(matches!(outcome, CaptureOutcome::Recorded(_)));

    let records = service.store().recent_records(10).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.user_id, "u1");
    assert_eq!(record.nickname.as_deref(), Some("Alice"));
    assert_eq!(record.message, "hello");
    assert_eq!(record.group_id, "g1");
    assert!(!record.is_bot_message);
}

#[tokio::test]
async fn whitelist_excludes_other_groups() {
    let mut config = memory_config();
    config.group_whitelist.insert("g2".into());
    let service = started(config).await;

    let outcome = service.on_group_message(alice_says("g1", "hello".into())).await;
    assert_eq!(outcome, CaptureOutcome::Skipped(SkipReason::GroupFiltered));
    assert_eq!(service.store().count_records().unwrap(), 0);
}

#[tokio::test]
async fn group_on_both_lists_is_not_recorded() {
    let mut config = memory_config();
    config.group_whitelist.insert("g1".into());
    config.group_blacklist.insert("g1".into());
    let service = started(config).await;

    service.on_group_message(alice_says("g1", "hello".into())).await;
    service.on_bot_response(bot_reply(LauncherType::Group)).await;
    assert_eq!(service.store().count_records().unwrap(), 0);
}

#[tokio::test]
async fn bot_response_is_recorded() {
    let service = started(memory_config()).await;

    let outcome = service.on_bot_response(bot_reply(LauncherType::Group)).await;
    assert!(matches!(outcome, CaptureOutcome::Recorded(_)));

    let mut with_adapter = bot_reply(LauncherType::Group);
    with_adapter.adapter = Some(AdapterInfo {
        bot_account_id: Some("424242".into()),
    });
    service.on_bot_response(with_adapter).await;

    let records = service.store().recent_records(10).unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.message, "[bot] hi");
        assert!(record.is_bot_message);
        assert_eq!(record.nickname.as_deref(), Some("LangBot"));
        assert_eq!(record.group_id, "g1");
    }
    let mut ids: Vec<_> = records.iter().map(|r| r.user_id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, ["424242", "bot"]);
}

#[tokio::test]
async fn private_bot_response_is_ignored() {
    let service = started(memory_config()).await;

    for launcher_type in [LauncherType::Person, LauncherType::Other("channel".into())] {
        let outcome = service.on_bot_response(bot_reply(launcher_type)).await;
        assert_eq!(outcome, CaptureOutcome::Skipped(SkipReason::NotGroupConversation));
    }
    assert_eq!(service.store().count_records().unwrap(), 0);
}

#[tokio::test]
async fn whitespace_message_is_not_recorded() {
    let service = started(memory_config()).await;

    let outcome = service.on_group_message(alice_says("g1", "   \n".into())).await;
    assert_eq!(outcome, CaptureOutcome::Skipped(SkipReason::EmptyMessage));

    let image_only: MessageChain =
        serde_json::from_value(json!({"messages": [{"type": "Image", "url": "x"}]})).unwrap();
    service.on_group_message(alice_says("g1", image_only)).await;

    assert_eq!(service.store().count_records().unwrap(), 0);
}

#[tokio::test]
async fn composite_chain_from_adapter_json() {
    let service = started(memory_config()).await;

    let event: GroupMessage = serde_json::from_value(json!({
        "launcher_id": 10001,
        "sender_id": 20002,
        "sender": {"nickname": "Bob"},
        "message_chain": {"messages": [
            {"type": "Source", "id": 7},
            {"type": "Plain", "text": "look at "},
            {"type": "Image", "url": "http://img"},
            "this"
        ]}
    }))
    .unwrap();
    service.on_group_message(event).await;

    let record = &service.store().recent_records(1).unwrap()[0];
    assert_eq!(record.message, "look at this");
    assert_eq!(record.user_id, "20002");
    assert_eq!(record.group_id, "10001");
    assert_eq!(record.nickname.as_deref(), Some("Bob"));
}

#[tokio::test]
async fn storage_failure_does_not_escape() {
    let service = started(memory_config()).await;
    service
        .store()
        .with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON chat_records
                 WHEN NEW.message = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
            )?;
            Ok(())
        })
        .unwrap();

    let outcome = service.on_group_message(alice_says("g1", "boom".into())).await;
    assert_eq!(outcome, CaptureOutcome::Dropped);

    let outcome = service.on_group_message(alice_says("g1", "still works".into())).await;
    assert!(matches!(outcome, CaptureOutcome::Recorded(_)));

    let records = service.store().recent_records(10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "still works");
}

#[tokio::test]
async fn events_before_initialize_are_dropped() {
    let service = CaptureService::new(memory_config());

    let outcome = service.on_group_message(alice_says("g1", "early".into())).await;
    assert_eq!(outcome, CaptureOutcome::Dropped);

    service.initialize().await.unwrap();
    let outcome = service.on_group_message(alice_says("g1", "on time".into())).await;
    assert!(matches!(outcome, CaptureOutcome::Recorded(_)));
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let never_started = CaptureService::new(memory_config());
    never_started.shutdown().await.unwrap();
    never_started.shutdown().await.unwrap();

    let service = started(memory_config()).await;
    service.shutdown().await.unwrap();
    service.shutdown().await.unwrap();
    assert_eq!(service.store().status(), StoreStatus::Closed);

    let outcome = service.on_group_message(alice_says("g1", "after".into())).await;
    assert_eq!(outcome, CaptureOutcome::Dropped);
    assert!(matches!(service.store().count_records(), Err(StoreError::Closed)));
}

#[tokio::test]
async fn initialize_failures_are_fatal() {
    let service = CaptureService::new(CaptureConfig {
        database_url: "postgresql://localhost/chat".into(),
        ..CaptureConfig::default()
    });
    assert!(matches!(service.initialize().await, Err(InitError::UnsupportedUrl(_))));
    assert_eq!(service.store().status(), StoreStatus::Uninitialized);
    service.shutdown().await.unwrap();

    // Parent "directory" is a regular file
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let service = CaptureService::new(CaptureConfig {
        database_url: blocker.join("chat.db").display().to_string(),
        ..CaptureConfig::default()
    });
    assert!(matches!(service.initialize().await, Err(InitError::Io { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_events_each_produce_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(
        started(CaptureConfig {
            database_url: format!("sqlite:///{}", dir.path().join("chat_logs.db").display()),
            ..CaptureConfig::default()
        })
        .await,
    );

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    service.on_group_message(alice_says("g1", format!("msg {i}").as_str().into())).await
                } else {
                    service.on_bot_response(bot_reply(LauncherType::Group)).await
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(matches!(handle.await.unwrap(), CaptureOutcome::Recorded(_)));
    }
    assert_eq!(service.store().count_records().unwrap(), 32);
    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn write_timeout_config_still_records() {
    let service = started(CaptureConfig {
        write_timeout_ms: Some(5_000),
        ..memory_config()
    })
    .await;

    let outcome = service.on_group_message(alice_says("g1", "quick".into())).await;
    assert!(matches!(outcome, CaptureOutcome::Recorded(_)));
}

#[tokio::test]
async fn timed_out_write_never_lands() {
    let service = started(CaptureConfig {
        write_timeout_ms: Some(50),
        ..memory_config()
    })
    .await;

    // Occupy the connection well past the write timeout
    let (held_tx, held_rx) = tokio::sync::oneshot::channel();
    let store = Arc::clone(service.store());
    let holder = tokio::task::spawn_blocking(move || {
        store.with_conn(|_| {
            let _ = held_tx.send(());
            std::thread::sleep(Duration::from_millis(400));
            Ok(())
        })
    });
    held_rx.await.unwrap();

    let outcome = service.on_group_message(alice_says("g1", "stuck".into())).await;
    assert_eq!(outcome, CaptureOutcome::Dropped);

    holder.await.unwrap().unwrap();
    // Let the queued writer reach the connection and see it was cancelled
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(service.store().count_records().unwrap(), 0);

    let outcome = service.on_group_message(alice_says("g1", "recovered".into())).await;
    assert!(matches!(outcome, CaptureOutcome::Recorded(_)));
    let records = service.store().recent_records(10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "recovered");
}
