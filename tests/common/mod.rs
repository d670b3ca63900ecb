//! Shared harness for the integration tests: an in-memory engine, a messenger
//! that records what would have been posted, and the bot state wired on top.

#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

use encore::commands::music::engine::PlaybackEngine;
use encore::commands::music::utils::messenger::Messenger;
use encore::commands::music::utils::player_messages::PlayerMessages;
use encore::commands::music::utils::selection::SelectionSessions;
use encore::config::Config;
use encore::Data;
use std::sync::{Arc, Once};

use mocks::{FakeEngine, RecordingMessenger};

static INIT: Once = Once::new();

/// Route `tracing` output through the test writer once per binary.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("encore=debug")
            .with_test_writer()
            .try_init();
    });
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DISCORD_TOKEN" => Some("test-token".to_string()),
        "SELECTION_TIMEOUT" => Some("30s".to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

pub struct Harness {
    pub engine: Arc<FakeEngine>,
    pub messenger: Arc<RecordingMessenger>,
    pub data: Data,
}

pub fn harness() -> Harness {
    init_tracing();
    let engine = Arc::new(FakeEngine::default());
    let messenger = Arc::new(RecordingMessenger::default());

    let dyn_engine: Arc<dyn PlaybackEngine> = engine.clone();
    let dyn_messenger: Arc<dyn Messenger> = messenger.clone();
    let data = Data {
        config: Arc::new(test_config()),
        engine: Arc::clone(&dyn_engine),
        player_messages: Arc::new(PlayerMessages::new(dyn_engine, Arc::clone(&dyn_messenger))),
        selections: Arc::new(SelectionSessions::new(dyn_messenger)),
    };

    Harness {
        engine,
        messenger,
        data,
    }
}
