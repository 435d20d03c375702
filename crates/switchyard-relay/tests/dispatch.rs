mod common;

use chrono::Duration;
use common::{
    from_bob, harness, harness_transcoding, harness_with, Event, FakeSlave, FakeTranscoder, ADMIN,
};
use switchyard_channels::{
    message_queue, CommandDescriptor, MediaFile, MediaKind, MessageBody, OutboundMedia,
};
use switchyard_core::config::RelayConfig;
use switchyard_core::{ChatKey, ChatType, Identity, MessageKind, MessageRef};
use switchyard_relay::{deliver, handle_interaction, run_pool, RelayError};
use switchyard_sessions::Session;

#[tokio::test]
async fn consecutive_text_is_merged_into_one_message() {
    let h = harness(FakeSlave::bob());

    deliver(&h.ctx, from_bob("hello")).await.unwrap();
    let first = match h.master.last() {
        Event::Sent { msg, text, .. } => {
            assert_eq!(msg.chat, ADMIN);
            assert_eq!(text, "★☺ Bob:\nhello");
            msg
        }
        other => panic!("expected a send, got {other:?}"),
    };

    h.clock.advance(Duration::seconds(5));
    deliver(&h.ctx, from_bob("world")).await.unwrap();
    assert_eq!(
        h.master.last(),
        Event::Edited {
            msg: first.clone(),
            text: "★☺ Bob:\nhello\nworld".into(),
            keyboard: None,
        }
    );
    assert_eq!(h.master.events().len(), 2);

    let last = h
        .ctx
        .store
        .get_last_message(&h.ctx.master_key(ADMIN))
        .unwrap()
        .unwrap();
    assert_eq!(last.master_msg_id, first.message_id);
    assert_eq!(last.text, "hello\nworld");
    assert_eq!(last.slave_origin, ChatKey::new("fake", "bob"));
    assert!(last.update);

    let row = h
        .ctx
        .store
        .get_message_log(&h.ctx.master_key(ADMIN), &first.message_id)
        .unwrap()
        .unwrap();
    assert!(row.update);
    assert_eq!(row.text, "hello\nworld");
}

#[tokio::test]
async fn text_past_the_window_is_sent_separately() {
    let h = harness(FakeSlave::bob());

    deliver(&h.ctx, from_bob("first")).await.unwrap();
    h.clock.advance(Duration::seconds(60));
    deliver(&h.ctx, from_bob("second")).await.unwrap();

    let sends: Vec<String> = h
        .master
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Sent { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(sends, vec!["★☺ Bob:\nfirst", "★☺ Bob:\nsecond"]);
}

#[tokio::test]
async fn different_group_members_are_not_merged() {
    let h = harness(FakeSlave::bob());
    let room = Identity::new("room", "Room", "Room");
    let msg = |member: &str, text: &str| {
        switchyard_channels::NormalizedMessage::text("fake", "★", ChatType::Group, room.clone(), text)
            .with_member(Identity::new(member, member, member))
    };

    deliver(&h.ctx, msg("ann", "hi")).await.unwrap();
    deliver(&h.ctx, msg("ben", "hey")).await.unwrap();

    let events = h.master.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], Event::Sent { text, .. } if text == "★👥 ben [Room]:\nhey"));
}

#[tokio::test]
async fn linked_chat_goes_to_its_group_without_header() {
    let h = harness(FakeSlave::bob());
    h.ctx
        .store
        .add_association(&h.ctx.master_key("group-1"), &ChatKey::new("fake", "bob"))
        .unwrap();

    deliver(&h.ctx, from_bob("hello")).await.unwrap();
    match h.master.last() {
        Event::Sent { msg, text, .. } => {
            assert_eq!(msg.chat, "group-1");
            assert_eq!(text, "hello");
        }
        other => panic!("expected a send, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_byte_media_sends_one_notice_and_is_not_logged() {
    let h = harness(FakeSlave::bob());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.png");
    std::fs::write(&path, b"").unwrap();

    let msg = from_bob("").with_body(MessageBody::Image(MediaFile::new(&path, "image/png")));
    deliver(&h.ctx, msg).await.unwrap();

    let events = h.master.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Event::Sent { text, .. } if text == "★☺ Bob:\nError: Empty Image received. (MS01)"
    ));
    assert!(h
        .ctx
        .store
        .get_last_message(&h.ctx.master_key(ADMIN))
        .unwrap()
        .is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn picture_is_sent_with_default_caption_and_removed() {
    let h = harness(FakeSlave::bob());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.png");
    std::fs::write(&path, b"\x89PNG").unwrap();

    let msg = from_bob("").with_body(MessageBody::Image(MediaFile::new(&path, "image/png")));
    deliver(&h.ctx, msg).await.unwrap();

    match h.master.last() {
        Event::Media { media, .. } => {
            assert_eq!(media.kind, switchyard_channels::MediaKind::Photo);
            assert_eq!(media.caption, "★☺ Bob:\nsent a picture.");
        }
        other => panic!("expected media, got {other:?}"),
    }
    assert!(!path.exists());
}

fn command_message(callable: &str) -> switchyard_channels::NormalizedMessage {
    from_bob("Pick one").with_body(MessageBody::Command {
        commands: vec![CommandDescriptor {
            label: "Ping".into(),
            callable: callable.into(),
            args: "now".into(),
        }],
    })
}

async fn deliver_menu(h: &common::Harness) -> MessageRef {
    deliver_menu_calling(h, "ping").await
}

async fn deliver_menu_calling(h: &common::Harness, callable: &str) -> MessageRef {
    deliver(&h.ctx, command_message(callable)).await.unwrap();
    match h.master.last() {
        Event::Sent { msg, keyboard, .. } => {
            assert_eq!(common::callback_data(&keyboard.unwrap()), vec!["0"]);
            msg
        }
        other => panic!("expected a send, got {other:?}"),
    }
}

#[tokio::test]
async fn command_menu_invokes_the_slave_function() {
    let h = harness(FakeSlave::bob());
    let prompt = deliver_menu(&h).await;
    assert!(matches!(h.ctx.sessions.get(&prompt), Some(Session::CommandPending(_))));

    handle_interaction(&h.ctx, &prompt, "0").await.unwrap();
    let (text, _) = h.master.last_edit(&prompt);
    assert_eq!(text, "★☺ Bob:\nPick one\n------\npong now");
    assert!(h.ctx.sessions.get(&prompt).is_none());
    assert!(h.ctx.prompt_locks.is_empty());
}

#[tokio::test]
async fn failing_command_is_reported_on_the_prompt() {
    let h = harness(FakeSlave::bob());
    let prompt = deliver_menu_calling(&h, "nope").await;

    let err = handle_interaction(&h.ctx, &prompt, "0").await.unwrap_err();
    assert_eq!(err.code(), "XC02");
    assert_eq!(
        h.master.last_edit(&prompt).0,
        "★☺ Bob:\nPick one\n------\nCommand not found in selected channel. (XC02)"
    );
    assert!(h.ctx.sessions.get(&prompt).is_none());
}

#[tokio::test]
async fn out_of_range_command_clears_the_session() {
    let h = harness(FakeSlave::bob());
    let prompt = deliver_menu(&h).await;

    let err = handle_interaction(&h.ctx, &prompt, "5").await.unwrap_err();
    assert_eq!(err.code(), "CE02");
    assert_eq!(h.master.last_edit(&prompt).0, "Index out of bound: 5. (CE02)");
    assert!(h.ctx.sessions.get(&prompt).is_none());

    let err = handle_interaction(&h.ctx, &prompt, "0").await.unwrap_err();
    assert!(matches!(err, RelayError::Session(_)));
    assert_eq!(err.code(), "SE01");
    assert_eq!(
        h.master.last_edit(&prompt).0,
        "Session expired. Please try again. (SE01)"
    );
}

#[tokio::test]
async fn pool_keeps_per_origin_order() {
    let h = harness(FakeSlave::bob());
    let (queue, rx) = message_queue();
    let pool = tokio::spawn(run_pool(h.ctx.clone(), rx));

    for text in ["a", "b", "c"] {
        queue.publish(from_bob(text)).unwrap();
    }
    drop(queue);
    pool.await.unwrap();

    let events = h.master.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events.last(),
        Some(Event::Edited { text, .. }) if text == "★☺ Bob:\na\nb\nc"
    ));
    assert!(h.ctx.dest_locks.is_empty());
}

#[tokio::test]
async fn pool_serves_many_origins_in_turn() {
    let h = harness(FakeSlave::bob());
    for i in 0..20 {
        h.ctx
            .store
            .add_association(
                &h.ctx.master_key(&format!("g{i}")),
                &ChatKey::new("fake", format!("u{i}")),
            )
            .unwrap();
    }
    let (queue, rx) = message_queue();
    let pool = tokio::spawn(run_pool(h.ctx.clone(), rx));

    for round in 0..3 {
        for i in 0..20 {
            let uid = format!("u{i}");
            queue
                .publish(common::from_user(&uid, &uid, &round.to_string()))
                .unwrap();
        }
    }
    drop(queue);
    pool.await.unwrap();

    for i in 0..20 {
        let group = format!("g{i}");
        let last = h
            .master
            .events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                Event::Sent { msg, text, .. } | Event::Edited { msg, text, .. }
                    if msg.chat == group =>
                {
                    Some(text)
                }
                _ => None,
            });
        assert_eq!(last.as_deref(), Some("0\n1\n2"), "{group}");
    }
    assert!(h.ctx.dest_locks.is_empty());
}

async fn empty_media_notice(body: fn(MediaFile) -> MessageBody, name: &str) -> String {
    let h = harness(FakeSlave::bob());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, b"").unwrap();

    deliver(&h.ctx, from_bob("").with_body(body(MediaFile::new(&path, "application/octet-stream"))))
        .await
        .unwrap();
    assert_eq!(h.master.events().len(), 1);
    assert!(!path.exists());
    match h.master.last() {
        Event::Sent { text, .. } => text,
        other => panic!("expected a notice, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_file_audio_and_video_have_their_own_codes() {
    assert_eq!(
        empty_media_notice(MessageBody::File, "a.bin").await,
        "★☺ Bob:\nError: Empty File received. (MS02)"
    );
    assert_eq!(
        empty_media_notice(MessageBody::Audio, "a.mp3").await,
        "★☺ Bob:\nError: Empty Audio received. (MS03)"
    );
    assert_eq!(
        empty_media_notice(MessageBody::Video, "a.mp4").await,
        "★☺ Bob:\nError: Empty Video received. (MS04)"
    );
}

fn media_event(event: Event) -> OutboundMedia {
    match event {
        Event::Media { media, .. } => media,
        other => panic!("expected media, got {other:?}"),
    }
}

fn audio_file(dir: &tempfile::TempDir, name: &str, mime: &str) -> MediaFile {
    let path = dir.path().join(name);
    std::fs::write(&path, b"ID3").unwrap();
    MediaFile::new(path, mime)
}

#[tokio::test]
async fn audio_is_sent_as_voice_and_both_files_are_removed() {
    let h = harness_transcoding(FakeSlave::bob(), FakeTranscoder::working());
    let dir = tempfile::tempdir().unwrap();
    let file = audio_file(&dir, "note.m4a", "audio/mp4");
    let input = file.path.clone();

    deliver(&h.ctx, from_bob("listen").with_body(MessageBody::Audio(file)))
        .await
        .unwrap();

    let media = media_event(h.master.last());
    assert_eq!(media.kind, MediaKind::Voice);
    assert_eq!(media.caption, "★☺ Bob:\nlisten");
    assert!(media.path.to_string_lossy().ends_with("note.m4a.ogg"));
    assert!(!media.path.exists());
    assert!(!input.exists());

    let last = h
        .ctx
        .store
        .get_last_message(&h.ctx.master_key(ADMIN))
        .unwrap()
        .unwrap();
    assert_eq!(last.msg_type, MessageKind::Audio);
}

#[tokio::test]
async fn audio_that_fails_to_transcode_is_sent_as_a_document() {
    let h = harness_transcoding(FakeSlave::bob(), FakeTranscoder::broken());
    let dir = tempfile::tempdir().unwrap();
    let file = audio_file(&dir, "note.m4a", "audio/mp4");

    deliver(&h.ctx, from_bob("").with_body(MessageBody::Audio(file)))
        .await
        .unwrap();

    let media = media_event(h.master.last());
    assert_eq!(media.kind, MediaKind::Document);
    assert_eq!(media.file_name.as_deref(), Some("note.m4a"));
    assert_eq!(media.caption, "★☺ Bob:\n");
}

#[tokio::test]
async fn without_conversion_only_mp3_goes_out_as_audio() {
    let config = RelayConfig {
        no_conversion: true,
        ..RelayConfig::default()
    };
    let h = harness_with(FakeSlave::bob(), config);
    let dir = tempfile::tempdir().unwrap();

    let mp3 = audio_file(&dir, "song.mp3", "audio/mpeg");
    deliver(&h.ctx, from_bob("").with_body(MessageBody::Audio(mp3)))
        .await
        .unwrap();
    assert_eq!(media_event(h.master.last()).kind, MediaKind::Audio);

    let ogg = audio_file(&dir, "memo.ogg", "audio/ogg");
    deliver(&h.ctx, from_bob("").with_body(MessageBody::Audio(ogg)))
        .await
        .unwrap();
    assert_eq!(media_event(h.master.last()).kind, MediaKind::Document);
}

#[tokio::test]
async fn video_gets_the_default_caption() {
    let h = harness(FakeSlave::bob());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"ftyp").unwrap();

    deliver(&h.ctx, from_bob("").with_body(MessageBody::Video(MediaFile::new(&path, "video/mp4"))))
        .await
        .unwrap();

    let media = media_event(h.master.last());
    assert_eq!(media.kind, MediaKind::Video);
    assert_eq!(media.caption, "★☺ Bob:\nsent a video.");
    assert!(!path.exists());
}

#[tokio::test]
async fn file_is_named_after_its_text_or_its_path() {
    let h = harness(FakeSlave::bob());
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str| {
        let path = dir.path().join(name);
        std::fs::write(&path, b"%PDF").unwrap();
        MediaFile::new(path, "application/pdf")
    };

    deliver(&h.ctx, from_bob("").with_body(MessageBody::File(write("report.pdf"))))
        .await
        .unwrap();
    let media = media_event(h.master.last());
    assert_eq!(media.kind, MediaKind::Document);
    assert_eq!(media.file_name.as_deref(), Some("report.pdf"));
    assert_eq!(media.caption, "★☺ Bob:\nsent a file.");

    deliver(&h.ctx, from_bob("Q3 figures.pdf").with_body(MessageBody::File(write("x1.pdf"))))
        .await
        .unwrap();
    let media = media_event(h.master.last());
    assert_eq!(media.file_name.as_deref(), Some("Q3 figures.pdf"));
    assert_eq!(media.caption, "★☺ Bob:\nQ3 figures.pdf");
}

#[tokio::test]
async fn gif_goes_out_as_an_animation() {
    let h = harness(FakeSlave::bob());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dance.gif");
    std::fs::write(&path, b"GIF89a").unwrap();

    deliver(&h.ctx, from_bob("").with_body(MessageBody::Image(MediaFile::new(&path, "image/gif"))))
        .await
        .unwrap();
    assert_eq!(media_event(h.master.last()).kind, MediaKind::Animation);
}

#[tokio::test]
async fn location_is_sent_as_a_venue() {
    let h = harness(FakeSlave::bob());
    let msg = from_bob("Cafe").with_body(MessageBody::Location {
        latitude: 48.85,
        longitude: 2.35,
    });

    deliver(&h.ctx, msg).await.unwrap();
    match h.master.last() {
        Event::Venue { venue, .. } => {
            assert_eq!(venue.title, "Cafe");
            assert_eq!(venue.address, "★☺ Bob:\n");
            assert_eq!(venue.latitude, 48.85);
            assert_eq!(venue.longitude, 2.35);
        }
        other => panic!("expected a venue, got {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_message_sends_a_notice() {
    let h = harness(FakeSlave::bob());

    deliver(&h.ctx, from_bob("").with_body(MessageBody::Unsupported))
        .await
        .unwrap();
    assert!(matches!(
        h.master.last(),
        Event::Sent { text, .. } if text == "★☺ Bob:\nUnsupported incoming message type. (UT01)"
    ));
    let last = h
        .ctx
        .store
        .get_last_message(&h.ctx.master_key(ADMIN))
        .unwrap()
        .unwrap();
    assert_eq!(last.msg_type, MessageKind::Unsupported);
}
