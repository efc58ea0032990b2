//! Integration tests for dictation-core crate

mod common;

use common::{complete_current, init_tracing, sequencer};
use dictation_core::{
    Continuation, DictationConfig, DictationError, DictationSession, EngineEvent, FileStore,
    MockSpeechEngine, Phase, SpeechErrorKind, StatusEvent, StatusLog, UtteranceSequencer,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[test]
fn test_speak_idle_submits_exactly_once() {
    let (mut seq, log) = sequencer();
    seq.speak("vocabulary", Some("mock-en-us"), 0.8, 1.2, Continuation::None)
        .expect("Should speak");

    let engine = seq.engine();
    assert_eq!(engine.submission_count(), 1);
    assert_eq!(engine.cancel_count(), 0);
    let request = engine.last_submitted().unwrap();
    assert_eq!(request.text(), "vocabulary");
    assert_eq!(request.voice_id(), Some("mock-en-us"));
    assert_eq!(request.rate(), 0.8);
    assert_eq!(request.pitch(), 1.2);
    assert!(log.is_empty());
}

#[test]
fn test_each_speak_cancels_only_the_previous() {
    let (mut seq, _log) = sequencer();
    for (i, word) in ["one", "two", "three", "four"].iter().enumerate() {
        seq.speak(word, None, 1.0, 1.0, Continuation::None).unwrap();
        assert_eq!(seq.engine().cancel_count(), i);
        assert_eq!(seq.engine().current(), seq.active_request().map(|r| r.id()));
    }
    assert_eq!(seq.engine().submission_count(), 4);
}

#[test]
fn test_sequence_waits_for_each_completion() {
    let (mut seq, _log) = sequencer();
    seq.speak_sequence(["a", "b", "c"]).unwrap();

    assert_eq!(seq.engine().submitted_texts(), vec!["a"]);
    assert!(complete_current(&mut seq));
    assert_eq!(seq.engine().submitted_texts(), vec!["a", "b"]);
    assert!(complete_current(&mut seq));
    assert_eq!(seq.engine().submitted_texts(), vec!["a", "b", "c"]);
    assert!(complete_current(&mut seq));
    assert!(!complete_current(&mut seq));

    assert_eq!(seq.engine().submission_count(), 3);
    assert!(!seq.is_active());
}

#[test]
fn test_empty_sequence_signals_nothing_to_read() {
    let (mut seq, log) = sequencer();
    assert_eq!(seq.speak_sequence(["", "  "]).unwrap(), 0);
    assert_eq!(seq.engine().submission_count(), 0);
    assert_eq!(log.events(), vec![StatusEvent::NothingToRead]);
}

#[test]
fn test_late_interruption_of_superseded_utterance_is_silent() {
    init_tracing();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let log = Arc::new(StatusLog::new());
    let engine = MockSpeechEngine::new().with_event_sender(tx);
    let mut seq = UtteranceSequencer::new(engine, log.clone());

    let first = seq.speak("apple", None, 1.0, 1.0, Continuation::None).unwrap();
    let second = seq.speak("banana", None, 1.0, 1.0, Continuation::None).unwrap();

    let late = rx.try_recv().expect("cancel should report an interruption");
    assert_eq!(late, EngineEvent::Failed(first, SpeechErrorKind::Interrupted));
    seq.handle_event(late);

    assert!(log.is_empty());
    assert_eq!(seq.active_request().unwrap().id(), second);
}

#[test]
fn test_unexpected_failure_reports_once_and_recovers() {
    let (mut seq, log) = sequencer();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    seq.speak(
        "apple",
        None,
        1.0,
        1.0,
        Continuation::callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    let event = seq
        .engine_mut()
        .fail_current(SpeechErrorKind::from_code("synthesis-failed"))
        .unwrap();
    seq.handle_event(event);

    assert_eq!(
        log.events(),
        vec![StatusEvent::SpeechError(SpeechErrorKind::SynthesisFailed)]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!seq.is_active());

    seq.speak("banana", None, 1.0, 1.0, Continuation::None).unwrap();
    assert!(complete_current(&mut seq));
    assert_eq!(log.len(), 1);
}

#[test]
fn test_retune_preserves_continuation_identity() {
    let (mut seq, _log) = sequencer();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let continuation = Continuation::callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    seq.speak("hello", None, 1.0, 1.0, continuation.clone()).unwrap();
    seq.retune(2.0, 0.5).unwrap();

    let request = seq.engine().last_submitted().unwrap();
    assert_eq!(request.text(), "hello");
    assert_eq!((request.rate(), request.pitch()), (2.0, 0.5));
    assert!(request.on_complete().same_as(&continuation));

    assert!(complete_current(&mut seq));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_channel_driven_read_all() {
    init_tracing();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let log = Arc::new(StatusLog::new());
    let engine = MockSpeechEngine::new()
        .with_event_sender(tx)
        .with_auto_complete();
    let mut seq = UtteranceSequencer::new(engine, log.clone());

    assert_eq!(seq.speak_sequence(["猫", "dog", "bird"]).unwrap(), 3);
    seq.drive(&mut rx).await;

    assert_eq!(seq.engine().submitted_texts(), vec!["猫", "dog", "bird"]);
    assert!(log.is_empty());
}

#[test]
fn test_session_survives_restart() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("preferences.json");
    let config = DictationConfig::default();

    {
        let store = FileStore::open(&path).unwrap();
        let mut session = DictationSession::open(
            MockSpeechEngine::new(),
            store,
            Arc::new(StatusLog::new()),
            &config,
        )
        .unwrap();
        session.set_item(0, "apple").unwrap();
        session.set_item(1, "香蕉").unwrap();
        session.set_rate(1.4).unwrap();
        session.set_theme("dark").unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    let mut session = DictationSession::open(
        MockSpeechEngine::new(),
        store,
        Arc::new(StatusLog::new()),
        &config,
    )
    .unwrap();

    assert_eq!(session.list().entered_items(), vec!["apple", "香蕉"]);
    assert_eq!(session.theme(), "dark");
    assert_eq!(session.sequencer().settings().rate, 1.4);

    session.start_dictation().unwrap();
    session.read_all().unwrap();
    assert_eq!(session.sequencer().engine().last_submitted().unwrap().rate(), 1.4);
}

#[test]
fn test_session_full_round() {
    init_tracing();
    let log = Arc::new(StatusLog::new());
    let dir = TempDir::new().unwrap();
    let mut session = DictationSession::open(
        MockSpeechEngine::new(),
        FileStore::open(dir.path().join("prefs.json")).unwrap(),
        log.clone(),
        &DictationConfig::default(),
    )
    .unwrap();

    assert!(session.export_text().is_err());
    assert_eq!(session.start_dictation(), Err(DictationError::NothingEntered));

    session.set_item(0, "apple").unwrap();
    session.set_item(3, "cherry").unwrap();
    session.start_dictation().unwrap();
    assert_eq!(session.phase(), Phase::Dictation);

    session.shuffle().unwrap();
    assert_eq!(session.read_all().unwrap(), 2);
    while let Some(event) = session.sequencer_mut().engine_mut().complete_current() {
        session.handle_event(event);
    }
    assert_eq!(session.sequencer().engine().submission_count(), 2);

    session.show_answers().unwrap();
    let exported = session.export_text().unwrap();
    assert_eq!(exported.split("\r\n").count(), 2);

    session.reset().unwrap();
    assert_eq!(session.phase(), Phase::Entry);
    assert_eq!(log.events(), vec![StatusEvent::Shuffled]);
}
