use serde_json::{Value, json};
use vkpoll_events::{
    DecodeError, Event, FlagOp, MessageFlags, MutedUntil, Platform, RawUpdate, ReadDirection,
    TypingScope, decode, decode_batch,
};

fn raw(v: Value) -> RawUpdate {
    RawUpdate::from(v)
}

// ── AddMessage ────────────────────────────────────────────────────────────────

#[test]
fn add_message_minimal() {
    let ev = decode(&raw(json!([4, 17, 0, 555, 0, "hi"]))).unwrap();
    let Event::MessageAdded(m) = ev else { panic!("expected MessageAdded, got {ev:?}") };
    assert_eq!(m.id, 17);
    assert_eq!(m.user_id, 555);
    assert_eq!(m.text, "hi");
    assert_eq!(m.flags, MessageFlags::empty());
    assert!(!m.is_outbox());
    assert!(m.extras.is_empty());
    assert_eq!(m.sent_at(), None);
}

#[test]
fn add_message_with_extras_and_timestamp() {
    let ev = decode(&raw(json!([4, 99, 3, 2000000001, 1500000000, "yo", {"title": " ... "}, {"attach1": "photo1_2"}]))).unwrap();
    let m = ev.into_message().unwrap();
    assert!(m.is_outbox());
    assert!(m.flags.contains(MessageFlags::UNREAD));
    assert_eq!(m.extras.len(), 2);
    assert_eq!(m.sent_at().unwrap().timestamp(), 1_500_000_000);
}

#[test]
fn add_message_too_short_is_arity_error() {
    let err = decode(&raw(json!([4, 17, 0, 555]))).unwrap_err();
    assert_eq!(err, DecodeError::Arity { code: 4, expected: 6, got: 4 });
}

#[test]
fn add_message_wrong_text_type() {
    let err = decode(&raw(json!([4, 17, 0, 555, 0, 12]))).unwrap_err();
    assert_eq!(err, DecodeError::Field { code: 4, index: 5, expected: "a string" });
}

// ── Batch behaviour ───────────────────────────────────────────────────────────

#[test]
fn malformed_record_does_not_stop_batch() {
    let batch = vec![
        raw(json!([4, 1, 0, 10, 0, "ok"])),
        raw(json!([4, "x", 0, 10, 0, "bad id"])),
        raw(json!("not an array")),
        raw(json!([])),
        raw(json!([80, 5, 0])),
    ];
    let out = decode_batch(&batch);
    assert_eq!(out.len(), 5);
    let messages: Vec<_> = out.iter().filter_map(|r| r.as_ref().ok()).filter_map(Event::as_message).collect();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "ok");
    assert!(out[1].is_err());
    assert!(matches!(out[2], Err(DecodeError::InvalidCode(_))));
    assert_eq!(out[3], Err(DecodeError::Empty));
    assert_eq!(out[4], Ok(Event::UnreadCounterChanged { count: 5 }));
}

#[test]
fn unknown_codes_never_fail() {
    for code in [0, 5, 13, 50, 63, 81, 113, 115, 9999, -1] {
        assert_eq!(decode(&raw(json!([code]))), Ok(Event::Unknown { code }));
        assert_eq!(decode(&raw(json!([code, "anything", {"x": 1}, null]))), Ok(Event::Unknown { code }));
    }
}

// ── Other codes ───────────────────────────────────────────────────────────────

#[test]
fn message_flag_events() {
    let ev = decode(&raw(json!([2, 500, 128, 42]))).unwrap();
    let Event::MessageFlagsInstalled(u) = ev else { panic!("got {ev:?}") };
    assert_eq!(u.message_id, 500);
    assert_eq!(u.mask, MessageFlags::DELETED);
    assert_eq!(u.peer_id, Some(42));

    assert!(matches!(decode(&raw(json!([1, 5, 1]))), Ok(Event::MessageFlagsReplaced(u)) if u.peer_id.is_none()));
    assert!(matches!(decode(&raw(json!([3, 5, 1]))), Ok(Event::MessageFlagsReset(_))));
}

#[test]
fn read_events() {
    assert_eq!(
        decode(&raw(json!([6, 300, 77]))),
        Ok(Event::MessagesRead { peer_id: 300, local_id: 77, direction: ReadDirection::Incoming })
    );
    assert_eq!(decode(&raw(json!([7, 300, 78]))).unwrap().code(), 7);
}

#[test]
fn presence_online_and_offline() {
    let Event::PresenceChanged(p) = decode(&raw(json!([8, -123, 4, 1500000000]))).unwrap() else { panic!() };
    assert_eq!(p.user_id, 123);
    assert!(p.online);
    assert_eq!(p.platform, Some(Platform::Android));
    assert_eq!(p.timestamp, Some(1_500_000_000));

    let Event::PresenceChanged(p) = decode(&raw(json!([9, -123, 1]))).unwrap() else { panic!() };
    assert!(!p.online);
    assert!(p.timed_out());
    assert_eq!(p.platform, None);
}

#[test]
fn dialog_flag_ops() {
    let cases = [(10, FlagOp::Reset), (11, FlagOp::Replace), (12, FlagOp::Install)];
    for (code, op) in cases {
        let ev = decode(&raw(json!([code, 2000000005, 3]))).unwrap();
        let Event::DialogFlagsChanged { peer_id, flags, op: got } = ev else { panic!("got {ev:?}") };
        assert_eq!(peer_id, 2_000_000_005);
        assert_eq!(flags.bits(), 3);
        assert_eq!(got, op);
    }
    assert_eq!(FlagOp::Reset.apply(0b111, 0b010), 0b101);
    assert_eq!(FlagOp::Install.apply(0b001, 0b010), 0b011);
    assert_eq!(FlagOp::Replace.apply(0b111, 0b010), 0b010);
}

#[test]
fn typing_tie_break() {
    assert_eq!(
        decode(&raw(json!([61, 55, 1]))),
        Ok(Event::TypingStarted { user_id: 55, scope: TypingScope::Dialog })
    );
    assert_eq!(
        decode(&raw(json!([61, 55]))),
        Ok(Event::TypingStarted { user_id: 55, scope: TypingScope::Dialog })
    );
    assert_eq!(
        decode(&raw(json!([61, 55, 9]))),
        Ok(Event::TypingStarted { user_id: 55, scope: TypingScope::Conversation { chat_id: 9 } })
    );
    assert_eq!(
        decode(&raw(json!([62, 55, 1]))),
        Ok(Event::TypingStarted { user_id: 55, scope: TypingScope::Conversation { chat_id: 1 } })
    );
}

#[test]
fn typing_reports_code_of_its_scope() {
    assert_eq!(decode(&raw(json!([62, 55, 7]))).unwrap().code(), 62);
    assert_eq!(decode(&raw(json!([61, 55, 7]))).unwrap().code(), 62);
    assert_eq!(decode(&raw(json!([61, 55, 1]))).unwrap().code(), 61);
}

#[test]
fn call_counter_conversation() {
    assert_eq!(decode(&raw(json!([70, 12, 34]))), Ok(Event::CallCompleted { user_id: 12, call_id: 34 }));
    assert_eq!(decode(&raw(json!([80, "8", 0]))), Ok(Event::UnreadCounterChanged { count: 8 }));
    assert_eq!(
        decode(&raw(json!([51, 3, 1]))),
        Ok(Event::ConversationChanged { chat_id: 3, by_self: true })
    );
}

#[test]
fn notification_settings_both_shapes() {
    assert_eq!(
        decode(&raw(json!([114, {"peer_id": 10, "sound": 1, "disabled_until": -1}]))),
        Ok(Event::NotificationSettingsChanged { peer_id: 10, sound_enabled: true, muted_until: MutedUntil::Forever })
    );
    assert_eq!(
        decode(&raw(json!([114, 10, 0, 1600000000]))),
        Ok(Event::NotificationSettingsChanged {
            peer_id: 10,
            sound_enabled: false,
            muted_until: MutedUntil::Until(1_600_000_000),
        })
    );
    assert!(decode(&raw(json!([114, {"sound": 1}]))).is_err());
}

#[test]
fn notification_settings_wrong_typed_mute_is_rejected() {
    assert_eq!(
        decode(&raw(json!([114, {"peer_id": 10, "sound": 1, "disabled_until": "soon"}]))),
        Err(DecodeError::Field { code: 114, index: 1, expected: "a settings object" })
    );
    assert!(decode(&raw(json!([114, 10, 1, "soon"]))).is_err());
    assert_eq!(
        decode(&raw(json!([114, {"peer_id": 10, "sound": 0, "disabled_until": null}]))),
        Ok(Event::NotificationSettingsChanged { peer_id: 10, sound_enabled: false, muted_until: MutedUntil::NotMuted })
    );
}
