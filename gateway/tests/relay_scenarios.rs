//! End-to-end call scenarios driven through scripted telephony and backend peers.
//!
//! All tests run on tokio's paused clock, so idle timeouts and knowledge
//! delays elapse instantly and deterministically.

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request};
use tokio::time::{Instant, sleep};
use tower::util::ServiceExt;

use fixtures::*;
use phonebridge_gateway::core::knowledge::{FALLBACK_ANSWER, KnowledgeApi};
use phonebridge_gateway::core::realtime::openai::ClientEvent;
use phonebridge_gateway::core::relay::{Link, LinkCommand, TelephonyOutgoing, TerminationReason};
use phonebridge_gateway::core::signal::{Disposition, SignalStore};
use phonebridge_gateway::{routes, state::AppState};

const HANDSHAKE: [&str; 3] = ["session.update", "conversation.item.create", "response.create"];

/// Let every relay task run until it blocks.
async fn settle() {
    sleep(Duration::from_millis(50)).await;
}

fn no_knowledge() -> Arc<dyn KnowledgeApi> {
    ScriptedKnowledge::answering("unused", Duration::ZERO)
}

async fn end_stream_markup(signals: Arc<dyn SignalStore>) -> String {
    let state = AppState::from_parts(
        test_config(),
        Arc::new(ScriptedConnector::unavailable()),
        knowledge_client(no_knowledge()),
        signals,
        None,
    );
    let app = routes::create_app(state);

    let request = Request::builder()
        .uri(format!("/end-stream/{SESSION_ID}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn appended_audio(commands: &[LinkCommand<ClientEvent>]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            LinkCommand::Send(ClientEvent::InputAudioBufferAppend { audio }) => {
                Some(audio.clone())
            }
            _ => None,
        })
        .collect()
}

// =============================================================================
// Scenario A: silent call times out
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_silent_call_hangs_up_after_idle_timeout() {
    let signals = memory_signals();
    let mut h = CallHarness::start(no_knowledge(), signals.clone());
    let started = Instant::now();

    let outcome = (&mut h.call).await.unwrap();

    assert_eq!(outcome.reason, TerminationReason::IdleTimeout);
    assert_eq!(outcome.disposition, Some(Disposition::Hangup));
    let elapsed = started.elapsed();
    assert!(elapsed > Duration::from_secs(40), "ended after {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(46), "ended after {elapsed:?}");

    assert!(h.state.is_terminated());
    assert_eq!(
        signals.disposition(SESSION_ID).await.unwrap(),
        Some(Disposition::Hangup)
    );

    let telephony = telephony_labels(&h.telephony.drain());
    assert!(telephony.contains(&"clear".to_string()));
    assert!(telephony.contains(&"close".to_string()));
    assert!(!telephony.iter().any(|l| l.starts_with("media:")));

    let backend = backend_kinds(&h.backend.drain());
    assert_eq!(backend[..3], HANDSHAKE);
    assert!(backend.contains(&"response.cancel"));
    assert!(backend.contains(&"close"));

    let markup = end_stream_markup(signals).await;
    assert!(markup.contains("<Hangup/>"), "{markup}");
    assert!(!markup.contains("<Dial>"));
}

#[tokio::test(start_paused = true)]
async fn test_backend_traffic_keeps_call_alive() {
    let h = CallHarness::start(no_knowledge(), memory_signals());
    let started = Instant::now();

    for _ in 0..3 {
        sleep(Duration::from_secs(30)).await;
        assert!(!h.state.is_terminated());
        h.model(r#"{"type":"rate_limits.updated","rate_limits":[]}"#)
            .await;
    }
    sleep(Duration::from_millis(39_900)).await;
    assert!(!h.state.is_terminated());

    let outcome = h.call.await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::IdleTimeout);
    assert!(started.elapsed() > Duration::from_secs(130));
}

// =============================================================================
// Scenario B: support handoff
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_call_support_ends_call_without_hangup_signal() {
    let signals = memory_signals();
    let mut h = CallHarness::start(no_knowledge(), signals.clone());

    h.caller(&start_frame("MZ1")).await;
    settle().await;
    h.model(&function_call("call_support", "call-9", "{}")).await;

    let outcome = (&mut h.call).await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::SupportHandoff);
    assert_eq!(outcome.disposition, Some(Disposition::Transfer));
    assert!(h.state.is_terminated());

    assert_eq!(signals.get(SESSION_ID).await.unwrap(), None);
    assert!(telephony_labels(&h.telephony.drain()).contains(&"close".to_string()));
    assert!(backend_kinds(&h.backend.drain()).contains(&"close"));

    let markup = end_stream_markup(signals).await;
    assert!(
        markup.contains("<Dial><Number>+15550001111</Number></Dial>"),
        "{markup}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_function_name_from_output_item() {
    let h = CallHarness::start(no_knowledge(), memory_signals());

    h.model(
        r#"{"type":"response.output_item.added","response_id":"r1","output_index":0,
            "item":{"id":"item-3","type":"function_call","call_id":"call-3","name":"call_support"}}"#,
    )
    .await;
    h.model(r#"{"type":"response.function_call_arguments.done","call_id":"call-3","arguments":"{}"}"#)
        .await;

    let outcome = h.call.await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::SupportHandoff);
}

// =============================================================================
// Scenario C: knowledge lookup
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_knowledge_lookup_plays_sound_then_clears() {
    let knowledge = ScriptedKnowledge::answering("We open at nine.", Duration::from_secs(3));
    let mut h = CallHarness::start(knowledge.clone(), memory_signals());

    h.caller(&start_frame("MZ1")).await;
    settle().await;

    for _ in 0..5 {
        h.model(&audio_delta("AAAA")).await;
    }
    h.model(&function_call(
        "get_additional_context",
        "call-1",
        r#"{"query":"A user asked: when do you open?"}"#,
    ))
    .await;

    // Lookup in flight
    sleep(Duration::from_secs(1)).await;
    let mut expected = vec!["media:AAAA".to_string(); 5];
    expected.push(format!("media:{THINKING_SOUND}"));
    assert_eq!(telephony_labels(&h.telephony.drain()), expected);
    assert_eq!(backend_kinds(&h.backend.drain()), HANDSHAKE);
    assert_eq!(knowledge.query_count(), 1);

    // Lookup done
    sleep(Duration::from_secs(3)).await;
    assert_eq!(telephony_labels(&h.telephony.drain()), vec!["clear"]);

    let backend = h.backend.drain();
    assert_eq!(
        backend_kinds(&backend),
        vec!["response.cancel", "conversation.item.create", "response.create"]
    );
    let LinkCommand::Send(output) = &backend[1] else {
        panic!("expected function output");
    };
    let output = serde_json::to_value(output).unwrap();
    assert_eq!(output["item"]["type"], "function_call_output");
    assert_eq!(output["item"]["call_id"], "call-1");
    assert_eq!(output["item"]["output"], "We open at nine.");

    h.caller(STOP_FRAME).await;
    let outcome = (&mut h.call).await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::CallerHungUp);
    assert_eq!(outcome.disposition, None);
}

#[tokio::test(start_paused = true)]
async fn test_slow_lookup_keeps_call_alive() {
    let signals = memory_signals();
    let knowledge = ScriptedKnowledge::stalling(Duration::from_secs(15));
    let mut h = CallHarness::start(knowledge.clone(), signals.clone());

    h.caller(&start_frame("MZ1")).await;
    settle().await;
    h.model(&function_call(
        "get_additional_context",
        "call-5",
        r#"{"query":"A user asked: is the branch open on Sunday?"}"#,
    ))
    .await;

    // Three 15s attempts with 2s pauses: well past the idle timeout
    sleep(Duration::from_secs(60)).await;

    assert!(!h.state.is_terminated());
    assert_eq!(knowledge.query_count(), 3);
    assert_eq!(signals.get(SESSION_ID).await.unwrap(), None);

    let backend = h.backend.drain();
    let output = backend
        .iter()
        .find_map(|c| match c {
            LinkCommand::Send(event @ ClientEvent::ConversationItemCreate { item, .. })
                if item.item_type == "function_call_output" =>
            {
                Some(serde_json::to_value(event).unwrap())
            }
            _ => None,
        })
        .expect("fallback answer sent");
    assert_eq!(output["item"]["output"], FALLBACK_ANSWER);
    assert_eq!(backend_kinds(&backend).last(), Some(&"response.create"));

    h.caller(STOP_FRAME).await;
    let outcome = (&mut h.call).await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::CallerHungUp);
}

#[tokio::test(start_paused = true)]
async fn test_knowledge_failure_answers_with_fallback() {
    let knowledge = ScriptedKnowledge::failing();
    let mut h = CallHarness::start(knowledge.clone(), memory_signals());

    h.caller(&start_frame("MZ1")).await;
    settle().await;
    h.model(&function_call(
        "get_additional_context",
        "call-2",
        r#"{"query":"A user asked: anything"}"#,
    ))
    .await;

    sleep(Duration::from_secs(10)).await;
    assert_eq!(knowledge.query_count(), 3);

    let backend = h.backend.drain();
    let output = backend
        .iter()
        .find_map(|c| match c {
            LinkCommand::Send(event @ ClientEvent::ConversationItemCreate { item, .. })
                if item.item_type == "function_call_output" =>
            {
                Some(serde_json::to_value(event).unwrap())
            }
            _ => None,
        })
        .expect("function output sent");
    assert_eq!(output["item"]["output"], FALLBACK_ANSWER);
    assert!(!h.state.is_terminated());

    h.caller(STOP_FRAME).await;
    (&mut h.call).await.unwrap();
}

// =============================================================================
// Interrupts and ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_dtmf_zero_stops_forwarding() {
    let signals = memory_signals();
    let mut h = CallHarness::start(no_knowledge(), signals.clone());

    h.caller(&start_frame("MZ1")).await;
    h.caller(&media_frame("QUFB")).await;
    h.caller(&dtmf_frame("0")).await;
    h.caller(&media_frame("QkJC")).await;
    h.model(&audio_delta("Q0ND")).await;

    let outcome = (&mut h.call).await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::CallerRequestedAgent);
    assert_eq!(outcome.disposition, Some(Disposition::Transfer));

    assert_eq!(appended_audio(&h.backend.drain()), vec!["QUFB"]);

    let telephony = telephony_labels(&h.telephony.drain());
    let close = telephony
        .iter()
        .position(|l| l == "close")
        .expect("telephony closed");
    assert!(!telephony[close..].iter().any(|l| l.starts_with("media:")));

    assert_eq!(signals.get(SESSION_ID).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_other_digits_are_ignored() {
    let mut h = CallHarness::start(no_knowledge(), memory_signals());

    h.caller(&start_frame("MZ1")).await;
    h.caller(&dtmf_frame("5")).await;
    h.caller(&media_frame("QUFB")).await;
    settle().await;

    assert!(!h.state.is_terminated());
    h.caller(STOP_FRAME).await;
    let outcome = (&mut h.call).await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::CallerHungUp);
    assert_eq!(appended_audio(&h.backend.drain()), vec!["QUFB"]);
}

#[tokio::test(start_paused = true)]
async fn test_audio_before_stream_start_is_dropped() {
    let mut h = CallHarness::start(no_knowledge(), memory_signals());

    h.caller("not json").await;
    h.caller(&media_frame("QUFB")).await;
    for _ in 0..3 {
        h.model(&audio_delta("AAAA")).await;
    }
    h.model("{broken").await;
    settle().await;

    assert!(!h.state.is_terminated());
    assert!(telephony_labels(&h.telephony.drain()).is_empty());
    // Caller audio flows even before the stream handle is known
    assert_eq!(appended_audio(&h.backend.drain()), vec!["QUFB"]);

    h.caller(&start_frame("MZ2")).await;
    settle().await;
    h.model(&audio_delta("BBBB")).await;
    settle().await;

    let commands = h.telephony.drain();
    assert_eq!(
        commands,
        vec![LinkCommand::Send(TelephonyOutgoing::media("MZ2", "BBBB"))]
    );

    h.caller(STOP_FRAME).await;
    (&mut h.call).await.unwrap();
    assert_eq!(h.state.stream_sid(), None);
}

#[tokio::test(start_paused = true)]
async fn test_speech_started_clears_before_next_audio() {
    let mut h = CallHarness::start(no_knowledge(), memory_signals());

    h.caller(&start_frame("MZ1")).await;
    settle().await;
    h.model(&audio_delta("AAAA")).await;
    h.model(SPEECH_STARTED).await;
    h.model(&audio_delta("BBBB")).await;
    settle().await;

    assert_eq!(
        telephony_labels(&h.telephony.drain()),
        vec!["media:AAAA", "clear", "media:BBBB"]
    );
    let backend = backend_kinds(&h.backend.drain());
    assert_eq!(backend[3..], ["response.cancel"]);

    h.caller(STOP_FRAME).await;
    (&mut h.call).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_audio_is_skipped() {
    let mut h = CallHarness::start(no_knowledge(), memory_signals());

    h.caller(&start_frame("MZ1")).await;
    settle().await;
    h.model(&audio_delta("%%%not-base64%%%")).await;
    h.model(&audio_delta("")).await;
    h.model(&audio_delta("AAAA")).await;
    settle().await;

    assert_eq!(telephony_labels(&h.telephony.drain()), vec!["media:AAAA"]);

    h.caller(STOP_FRAME).await;
    (&mut h.call).await.unwrap();
}

// =============================================================================
// Connection lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stalled_caller_does_not_block_teardown() {
    let mut h = CallHarness::start(no_knowledge(), memory_signals());

    h.caller(&start_frame("MZ1")).await;
    settle().await;

    // Telephony peer never drains, so its write queue fills up
    for _ in 0..1100 {
        h.model(&audio_delta("AAAA")).await;
    }
    settle().await;
    h.caller(&dtmf_frame("0")).await;

    let outcome = tokio::time::timeout(Duration::from_secs(30), &mut h.call)
        .await
        .expect("call finished despite a stalled caller")
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::CallerRequestedAgent);
    assert_eq!(outcome.disposition, Some(Disposition::Transfer));
    assert!(h.state.is_terminated());
    assert!(backend_kinds(&h.backend.drain()).contains(&"close"));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_unit_fails_call_and_closes_links() {
    let mut h = CallHarness::start(Arc::new(PanickingKnowledge), memory_signals());

    h.caller(&start_frame("MZ1")).await;
    settle().await;
    h.model(&function_call(
        "get_additional_context",
        "call-6",
        r#"{"query":"A user asked: anything"}"#,
    ))
    .await;

    let outcome = (&mut h.call).await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::PumpFailed);
    assert_eq!(outcome.disposition, None);
    assert!(h.state.is_terminated());

    assert!(backend_kinds(&h.backend.drain()).contains(&"close"));
    assert!(telephony_labels(&h.telephony.drain()).contains(&"close".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_backend_unavailable_ends_call_quietly() {
    let (_unused, backend) = Link::<ClientEvent>::pair();
    let mut h = CallHarness::start_with(
        Arc::new(ScriptedConnector::unavailable()),
        backend,
        no_knowledge(),
        memory_signals(),
    );

    let outcome = (&mut h.call).await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::BackendUnavailable);
    assert_eq!(outcome.disposition, None);
    assert_eq!(telephony_labels(&h.telephony.drain()), vec!["close"]);
}

#[tokio::test(start_paused = true)]
async fn test_backend_close_ends_call() {
    let h = CallHarness::start(no_knowledge(), memory_signals());
    let CallHarness {
        backend,
        call,
        state,
        ..
    } = h;
    drop(backend.inbound);

    let outcome = call.await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::BackendClosed);
    assert!(state.is_terminated());
}

#[tokio::test(start_paused = true)]
async fn test_caller_disconnect_ends_call() {
    let h = CallHarness::start(no_knowledge(), memory_signals());
    let CallHarness {
        telephony,
        mut backend,
        call,
        ..
    } = h;
    drop(telephony);

    let outcome = call.await.unwrap();
    assert_eq!(outcome.reason, TerminationReason::CallerHungUp);
    assert!(backend_kinds(&backend.drain()).contains(&"close"));
}
