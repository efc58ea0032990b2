//! Shared helpers for integration tests

#![allow(dead_code)]

use dictation_core::{MockSpeechEngine, StatusLog, UtteranceSequencer};
use std::sync::Arc;

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Sequencer over a fresh mock engine, plus its status log
pub fn sequencer() -> (UtteranceSequencer<MockSpeechEngine>, Arc<StatusLog>) {
    init_tracing();
    let log = Arc::new(StatusLog::new());
    let sequencer = UtteranceSequencer::new(MockSpeechEngine::new(), log.clone());
    (sequencer, log)
}

/// Let the engine finish its current utterance and deliver the signal
pub fn complete_current(sequencer: &mut UtteranceSequencer<MockSpeechEngine>) -> bool {
    match sequencer.engine_mut().complete_current() {
        Some(event) => {
            sequencer.handle_event(event);
            true
        }
        None => false,
    }
}
