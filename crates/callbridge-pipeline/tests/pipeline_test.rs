mod common;

use callbridge_pipeline::{CallReport, IntakeEnd, PipelineConfig, QueueCapacities, TransportError};
use callbridge_types::{InboundEvent, Role, StreamSessionId};
use common::{
    media, raw_media, scripted, scripted_results, start, stop, test_config, Harness,
    MockDialogue, MockRecognizer, RecognizerMode, RecordingSink, GREETING,
};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Every test call must finish on its own; a hang is a failure.
async fn run_call(harness: &Harness, events: Vec<InboundEvent>, sink: &RecordingSink) -> CallReport {
    tokio::time::timeout(
        Duration::from_secs(10),
        harness.pipeline.run(scripted(events), sink.clone()),
    )
    .await
    .expect("call pipeline did not terminate")
}

#[tokio::test]
async fn full_call_greets_then_answers_in_order() {
    let harness = Harness::default();
    let sink = RecordingSink::default();

    let report = run_call(
        &harness,
        vec![
            serde_json::from_str(r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#)
                .unwrap(),
            start("MZ100"),
            media(b"hello"),
            media(b"are you open today"),
            stop(),
        ],
        &sink,
    )
    .await;

    assert!(report.started());
    assert_eq!(report.stream_sid, Some(StreamSessionId::new("MZ100")));
    assert_eq!(
        sink.spoken(),
        format!("{}echo: helloecho: are you open today", GREETING)
    );
    assert!(sink
        .frames()
        .iter()
        .all(|f| f.stream_sid.as_str() == "MZ100"));
    assert!(sink.is_closed());

    let intake = report.intake.unwrap();
    assert_eq!(intake.end, IntakeEnd::Stopped);
    assert_eq!(intake.forwarded, 2);

    let dialogue = report.dialogue.unwrap();
    assert_eq!(dialogue.replies, 2);
    assert_eq!(dialogue.conversation.len(), 6);
    assert_eq!(report.synthesis.unwrap().utterances, 3);
}

#[tokio::test]
async fn nothing_downstream_starts_without_a_start_event() {
    let harness = Harness::default();
    let sink = RecordingSink::default();

    let report = run_call(&harness, vec![media(b"too early"), stop()], &sink).await;

    assert!(!report.started());
    assert!(report.transcription.is_none());
    assert!(report.dialogue.is_none());
    assert!(report.synthesis.is_none());
    assert_eq!(report.intake.unwrap().dropped, 1);
    assert_eq!(harness.recognizer.opens.load(Ordering::SeqCst), 0);
    assert!(harness.dialogue.calls().is_empty());
    assert!(sink.frames().is_empty());
}

#[tokio::test]
async fn media_before_start_and_undecodable_media_are_dropped() {
    let harness = Harness::default();
    let sink = RecordingSink::default();

    let report = run_call(
        &harness,
        vec![
            media(b"before start"),
            start("MZ101"),
            raw_media("%%% not base64 %%%"),
            media(b"after start"),
            stop(),
        ],
        &sink,
    )
    .await;

    let intake = report.intake.unwrap();
    assert_eq!(intake.forwarded, 1);
    assert_eq!(intake.dropped, 2);
    assert_eq!(harness.recognizer.sent(), vec![b"after start".to_vec()]);
    assert_eq!(sink.spoken(), format!("{}echo: after start", GREETING));
}

#[tokio::test]
async fn duplicate_start_keeps_the_first_stream_id() {
    let harness = Harness::default();
    let sink = RecordingSink::default();

    let report = run_call(
        &harness,
        vec![start("MZ-first"), start("MZ-second"), media(b"hi"), stop()],
        &sink,
    )
    .await;

    assert_eq!(report.stream_sid, Some(StreamSessionId::new("MZ-first")));
    assert!(sink
        .frames()
        .iter()
        .all(|f| f.stream_sid.as_str() == "MZ-first"));
}

#[tokio::test]
async fn disconnect_without_stop_still_shuts_down() {
    let harness = Harness::default();
    let sink = RecordingSink::default();

    let report = run_call(&harness, vec![start("MZ102"), media(b"are you there")], &sink).await;

    assert_eq!(report.intake.unwrap().end, IntakeEnd::Disconnected);
    assert_eq!(sink.spoken(), format!("{}echo: are you there", GREETING));
}

#[tokio::test]
async fn transport_error_ends_the_call_and_malformed_messages_are_skipped() {
    let harness = Harness::default();
    let sink = RecordingSink::default();

    let source = scripted_results(vec![
        Ok(start("MZ103")),
        Err(TransportError::Malformed("expected value at line 1".to_string())),
        Ok(media(b"still here")),
        Err(TransportError::Io("connection reset".to_string())),
        Ok(media(b"never read")),
    ]);
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        harness.pipeline.run(source, sink.clone()),
    )
    .await
    .expect("call pipeline did not terminate");

    let intake = report.intake.unwrap();
    assert_eq!(intake.malformed, 1);
    assert_eq!(
        intake.end,
        IntakeEnd::TransportError(TransportError::Io("connection reset".to_string()))
    );
    assert_eq!(sink.spoken(), format!("{}echo: still here", GREETING));
}

#[tokio::test]
async fn recognizer_outage_degrades_to_greeting_only() {
    let harness = Harness::new(
        MockRecognizer::new(RecognizerMode::FailOpen),
        MockDialogue::default(),
    );
    let sink = RecordingSink::default();

    let mut events = vec![start("MZ104")];
    events.extend((0..50).map(|i| media(format!("word {}", i).as_bytes())));
    events.push(stop());
    let report = run_call(&harness, events, &sink).await;

    assert_eq!(sink.spoken(), GREETING);
    let transcription = report.transcription.unwrap();
    assert!(transcription.engine_failed);
    assert_eq!(transcription.payloads, 50);
    assert_eq!(report.intake.unwrap().forwarded, 50);
}

#[tokio::test]
async fn recognizer_error_mid_call_never_blocks_intake() {
    let mut config = test_config();
    config.queues = QueueCapacities {
        audio: 1,
        text: 1,
        speech: 1,
    };
    let harness = Harness::with_config(
        MockRecognizer::new(RecognizerMode::ErrorAfterFirst),
        MockDialogue::default(),
        config,
    );
    let sink = RecordingSink::default();

    let mut events = vec![start("MZ105")];
    events.extend((0..30u8).map(|i| media(&[b'a' + (i % 26)])));
    events.push(stop());
    let report = run_call(&harness, events, &sink).await;

    assert_eq!(report.intake.unwrap().forwarded, 30);
    assert!(report.transcription.unwrap().engine_failed);
    assert!(sink.spoken().starts_with(GREETING));
}

#[tokio::test]
async fn a_failing_dialogue_turn_does_not_end_the_call() {
    let harness = Harness::default();
    let sink = RecordingSink::default();

    let report = run_call(
        &harness,
        vec![
            start("MZ106"),
            media(b"one"),
            media(b"this will fail"),
            media(b"three"),
            stop(),
        ],
        &sink,
    )
    .await;

    assert_eq!(sink.spoken(), format!("{}echo: oneecho: three", GREETING));
    let dialogue = report.dialogue.unwrap();
    assert_eq!(dialogue.replies, 2);
    assert_eq!(dialogue.failed_turns, 1);
    let roles: Vec<Role> = dialogue.conversation.turns().iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::System,
            Role::Assistant,
            Role::Caller,
            Role::Assistant,
            Role::Caller,
            Role::Assistant,
        ]
    );
}

#[tokio::test]
async fn panicking_stage_is_reported_and_the_call_still_ends() {
    let harness = Harness::default();
    let sink = RecordingSink::default();

    let report = run_call(
        &harness,
        vec![start("MZ107"), media(b"make it panic"), media(b"after"), stop()],
        &sink,
    )
    .await;

    assert!(report.dialogue.is_none());
    assert!(report.transcription.is_some());
    assert!(report.synthesis.is_some());
    assert_eq!(sink.spoken(), GREETING);
}

#[tokio::test]
async fn concurrent_calls_share_nothing() {
    let harness = Harness::default();
    let sink_a = RecordingSink::default();
    let sink_b = RecordingSink::default();

    let call_a = harness.pipeline.run(
        scripted(vec![start("MZ-a"), media(b"table for two"), stop()]),
        sink_a.clone(),
    );
    let call_b = harness.pipeline.run(
        scripted(vec![start("MZ-b"), media(b"do you deliver"), stop()]),
        sink_b.clone(),
    );
    let (report_a, report_b) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(call_a, call_b)
    })
    .await
    .expect("calls did not terminate");

    assert_ne!(report_a.call_id, report_b.call_id);
    assert_eq!(sink_a.spoken(), format!("{}echo: table for two", GREETING));
    assert_eq!(sink_b.spoken(), format!("{}echo: do you deliver", GREETING));
    assert!(sink_a.frames().iter().all(|f| f.stream_sid.as_str() == "MZ-a"));
    assert!(sink_b.frames().iter().all(|f| f.stream_sid.as_str() == "MZ-b"));

    let turns_a = report_a.dialogue.unwrap().conversation;
    assert!(turns_a
        .turns()
        .iter()
        .all(|t| !t.content.contains("deliver")));
}

#[tokio::test]
async fn default_config_runs_a_call() {
    let harness = Harness::with_config(
        MockRecognizer::default(),
        MockDialogue::default(),
        PipelineConfig::default(),
    );
    let sink = RecordingSink::default();

    run_call(&harness, vec![start("MZ108"), media(b"hi"), stop()], &sink).await;

    assert_eq!(sink.spoken(), format!("{}echo: hi", GREETING));
}
