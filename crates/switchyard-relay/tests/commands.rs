mod common;

use common::{harness, Event, FakeSlave, ADMIN};
use switchyard_core::MessageRef;
use switchyard_relay::commands::{extra_help, WELCOME};
use switchyard_relay::{handle_command, CommandOrigin, MasterCommand, RecogTarget};

fn origin(chat: &str, private: bool) -> CommandOrigin {
    CommandOrigin {
        message: MessageRef::new(chat, "500"),
        sender_chat: ADMIN.into(),
        is_private: private,
        recog_target: None,
    }
}

#[tokio::test]
async fn extra_lists_slave_functions() {
    let h = harness(FakeSlave::bob());
    let help = extra_help(&h.ctx);
    assert_eq!(
        help,
        "List of slave channel features:\n\n★ Fake\n\n/0_ping (Ping)\nUsage: /0_ping"
    );

    handle_command(&h.ctx, MasterCommand::Extra, &origin(ADMIN, true))
        .await
        .unwrap();
    assert!(matches!(h.master.last(), Event::Sent { text, .. } if text == help));
}

#[tokio::test]
async fn call_shows_placeholder_then_result() {
    let h = harness(FakeSlave::bob());
    let cmd = MasterCommand::parse("/0_ping hello").unwrap();
    handle_command(&h.ctx, cmd, &origin(ADMIN, true)).await.unwrap();

    let placeholder = match &h.master.events()[0] {
        Event::Sent { msg, text, .. } => {
            assert_eq!(text, "★ Fake: Ping\n-------\nPlease wait...");
            msg.clone()
        }
        other => panic!("expected a send, got {other:?}"),
    };
    assert_eq!(
        h.master.last_edit(&placeholder).0,
        "★ Fake: Ping\n-------\npong hello"
    );
}

#[tokio::test]
async fn call_with_bad_index_or_name_is_refused() {
    let h = harness(FakeSlave::bob());

    let err = handle_command(&h.ctx, MasterCommand::parse("/3_ping").unwrap(), &origin(ADMIN, true))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "XC01");

    let err = handle_command(&h.ctx, MasterCommand::parse("/0_pong").unwrap(), &origin(ADMIN, true))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "XC02");

    assert_eq!(
        h.master.replies(),
        vec![
            "Invalid slave channel ID. (XC01)",
            "Command not found in selected channel. (XC02)"
        ]
    );
}

#[tokio::test]
async fn recog_needs_a_voice_reply() {
    let h = harness(FakeSlave::bob());

    let err = handle_command(&h.ctx, MasterCommand::Recog(None), &origin(ADMIN, true))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "RS01");

    let mut o = origin(ADMIN, true);
    o.recog_target = Some(RecogTarget::Other);
    let err = handle_command(&h.ctx, MasterCommand::Recog(None), &o)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "RS02");

    assert_eq!(h.master.replies().len(), 2);
    assert!(h.master.replies()[1].ends_with("(RS02)"));
}

#[tokio::test]
async fn start_in_private_sends_welcome() {
    let h = harness(FakeSlave::bob());
    handle_command(&h.ctx, MasterCommand::Start(None), &origin(ADMIN, true))
        .await
        .unwrap();
    assert!(matches!(h.master.last(), Event::Sent { text, .. } if text == WELCOME));
}

#[tokio::test]
async fn start_in_group_with_stale_token_reports_lk01() {
    let h = harness(FakeSlave::bob());
    let err = handle_command(
        &h.ctx,
        MasterCommand::Start(Some("deadbeef".into())),
        &origin("group-9", false),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "LK01");
    match h.master.last() {
        Event::Sent { msg, text, .. } => {
            assert_eq!(msg.chat, "group-9");
            assert_eq!(text, "Link request expired or unknown. (LK01)");
        }
        other => panic!("expected a send, got {other:?}"),
    }
}

#[tokio::test]
async fn link_command_opens_a_picker_in_the_current_chat() {
    let h = harness(FakeSlave::with_users(2));
    handle_command(
        &h.ctx,
        MasterCommand::parse("/link").unwrap(),
        &origin("group-1", false),
    )
    .await
    .unwrap();
    match h.master.last() {
        Event::Edited { msg, text, .. } => {
            assert_eq!(msg.chat, "group-1");
            assert!(text.starts_with("Please choose the chat you want to link with ..."));
        }
        other => panic!("expected an edit, got {other:?}"),
    }
}
