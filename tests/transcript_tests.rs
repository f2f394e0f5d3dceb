use live_transcribe::{RecognitionEvent, TranscriptAggregator};

fn event(text: &str, is_final: bool) -> RecognitionEvent {
    let json = serde_json::json!({
        "results": [{
            "final": is_final,
            "alternatives": [{ "transcript": text }],
        }]
    });
    serde_json::from_value(json).unwrap()
}

#[test]
fn finals_concatenate_in_arrival_order() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.on_event(event("the quick ", true));
    aggregator.on_event(event("brown fox ", true));
    aggregator.on_event(event("jumps", true));

    assert_eq!(aggregator.on_close(), "the quick brown fox jumps");
}

#[test]
fn zero_events_yield_empty_transcript() {
    let mut aggregator = TranscriptAggregator::new();
    assert_eq!(aggregator.on_close(), "");
}

#[test]
fn trailing_interim_is_promoted_at_close() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.on_event(event("one ", true));
    aggregator.on_event(event("two", false));

    assert_eq!(aggregator.on_close(), "one two");
}

#[test]
fn on_close_is_idempotent() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.on_event(event("one ", true));
    aggregator.on_event(event("two", false));

    assert_eq!(aggregator.on_close(), "one two");
    assert_eq!(aggregator.on_close(), "one two");
    assert_eq!(aggregator.finals_count(), 2);
}

#[test]
fn interims_superseded_by_final_are_dropped() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.on_event(event("hel", false));
    aggregator.on_event(event("hello", false));
    aggregator.on_event(event("hello world", true));

    assert_eq!(aggregator.on_close(), "hello world");
}

#[test]
fn newer_interim_replaces_older_one() {
    let mut aggregator = TranscriptAggregator::new();
    aggregator.on_event(event("first ", true));
    aggregator.on_event(event("sec", false));
    aggregator.on_event(event("second", false));

    // Only the most recent interim survives the close.
    assert_eq!(aggregator.on_close(), "first second");
}

#[test]
fn live_updates_follow_arrival_order() {
    let mut aggregator = TranscriptAggregator::new();

    let first = aggregator.on_event(event("hel", false)).unwrap();
    assert_eq!(first.text, "hel");
    assert!(!first.is_final);

    let second = aggregator.on_event(event("hello world", true)).unwrap();
    assert_eq!(second.text, "hello world");
    assert!(second.is_final);
}

#[test]
fn events_without_results_or_alternatives_contribute_nothing() {
    let mut aggregator = TranscriptAggregator::new();

    let empty_results: RecognitionEvent =
        serde_json::from_str(r#"{"results":[]}"#).unwrap();
    let empty_alternatives: RecognitionEvent =
        serde_json::from_str(r#"{"results":[{"final":true,"alternatives":[]}]}"#).unwrap();

    assert!(aggregator.on_event(empty_results).is_none());
    assert!(aggregator.on_event(empty_alternatives).is_none());
    assert_eq!(aggregator.on_close(), "");
}

#[test]
fn only_the_primary_alternative_is_used() {
    let mut aggregator = TranscriptAggregator::new();
    let event: RecognitionEvent = serde_json::from_str(
        r#"{"results":[{"final":true,"alternatives":[
            {"transcript":"top choice"},
            {"transcript":"runner up"}
        ]}]}"#,
    )
    .unwrap();

    let update = aggregator.on_event(event).unwrap();
    assert_eq!(update.text, "top choice");
    assert_eq!(aggregator.on_close(), "top choice");
}
