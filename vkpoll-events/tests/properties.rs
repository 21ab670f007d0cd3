// Property tests for the flag decoders and the update decoder.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test -p vkpoll-events

use proptest::prelude::*;
use serde_json::{Value, json};
use vkpoll_events::{
    AnswerOptions, DialogFlags, Event, MessageFlags, RawUpdate, code, decode,
    decode_answer_options, decode_dialog_flags, decode_message_flags,
};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

/// Every code the decoder has a layout for.
const KNOWN_CODES: &[i64] = &[
    code::REPLACE_MESSAGE_FLAGS,
    code::INSTALL_MESSAGE_FLAGS,
    code::RESET_MESSAGE_FLAGS,
    code::ADD_MESSAGE,
    code::READ_INCOMING,
    code::READ_OUTGOING,
    code::FRIEND_ONLINE,
    code::FRIEND_OFFLINE,
    code::RESET_DIALOG_FLAGS,
    code::REPLACE_DIALOG_FLAGS,
    code::INSTALL_DIALOG_FLAGS,
    code::CONVERSATION_CHANGED,
    code::USER_TYPING,
    code::USER_TYPING_IN_CHAT,
    code::USER_CALL,
    code::COUNTER_UPDATE,
    code::NOTIFY_SETTINGS_CHANGED,
];

fn unknown_code() -> impl Strategy<Value = i64> {
    any::<i64>().prop_filter("code has a layout", |c| !KNOWN_CODES.contains(c))
}

fn json_field() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        ".{0,12}".prop_map(Value::from),
        (any::<i64>(), ".{0,6}").prop_map(|(n, s)| json!({ "n": n, "s": s })),
        prop::collection::vec(any::<i32>(), 0..4).prop_map(|v| json!(v)),
    ]
}

// ---------------------------------------------------------------------------
// Flag round-trips
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn message_flags_round_trip(mask in any::<u64>()) {
        let back: MessageFlags = decode_message_flags(mask).iter().collect();
        prop_assert_eq!(back.bits(), mask);
    }

    #[test]
    fn dialog_flags_round_trip(mask in any::<u64>()) {
        let back: DialogFlags = decode_dialog_flags(mask).iter().collect();
        prop_assert_eq!(back.bits(), mask);
    }

    #[test]
    fn answer_options_round_trip(mask in any::<u64>()) {
        let back: AnswerOptions = decode_answer_options(mask).iter().collect();
        prop_assert_eq!(back.bits(), mask);
    }
}

// ---------------------------------------------------------------------------
// Unknown codes
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn unrecognised_code_decodes_to_unknown(
        code in unknown_code(),
        rest in prop::collection::vec(json_field(), 0..8),
    ) {
        let mut fields = vec![Value::from(code)];
        fields.extend(rest);
        let event = decode(&RawUpdate::new(fields));
        prop_assert_eq!(event, Ok(Event::Unknown { code }));
    }
}
