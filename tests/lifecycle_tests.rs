//! Message, reaction and conversation lifecycle scenarios, run through the
//! real services, presence registry and broadcast router over in-memory
//! storage.

mod common;

use common::{drain_event_names, drain_events, TestApp};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use parley::application::services::{
    ConversationError, CreateConversationDto, MessageError, ReactionError, SendMessageDto,
};
use parley::domain::{ConversationKind, DELETED_PLACEHOLDER};
use parley::realtime::ServerEvent;

fn send_dto(conversation_id: Uuid, content: &str) -> SendMessageDto {
    SendMessageDto {
        conversation_id,
        content: content.to_string(),
        file_url: None,
        file_type: None,
        file_name: None,
    }
}

async fn direct_conversation(app: &TestApp, a: Uuid, b: Uuid) -> Uuid {
    app.conversation_service()
        .create_conversation(
            a,
            CreateConversationDto {
                kind: ConversationKind::Direct,
                title: None,
                participant_ids: vec![b],
            },
        )
        .await
        .unwrap()
        .id
}

async fn group_conversation(app: &TestApp, creator: Uuid, others: Vec<Uuid>) -> Uuid {
    app.conversation_service()
        .create_conversation(
            creator,
            CreateConversationDto {
                kind: ConversationKind::Group,
                title: Some("trip planning".into()),
                participant_ids: others,
            },
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn send_message_echoes_to_sender_and_recipient() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");

    let mut rx_alice = app.connect(alice.id);
    let mut rx_bob = app.connect(bob.id);

    let conversation_id = direct_conversation(&app, alice.id, bob.id).await;
    drain_events(&mut rx_alice);
    drain_events(&mut rx_bob);

    let message = app
        .message_service()
        .send_message(alice.id, send_dto(conversation_id, "hello bob"))
        .await
        .unwrap();

    // Bob receives exactly one new_message carrying Alice as sender
    let bob_events = drain_events(&mut rx_bob);
    assert_eq!(bob_events.len(), 1);
    match &bob_events[0].event {
        ServerEvent::NewMessage(payload) => {
            assert_eq!(payload.sender_id, Some(alice.id));
            assert_eq!(payload.message_id, message.id);
            assert_eq!(payload.content, "hello bob");
            assert_eq!(payload.sender_username, "alice");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    // Alice gets the self-echo for client-side confirmation
    assert_eq!(drain_event_names(&mut rx_alice), vec!["new_message"]);
}

#[tokio::test]
async fn send_message_requires_membership() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");
    let mallory = app.add_user("mallory");

    let conversation_id = direct_conversation(&app, alice.id, bob.id).await;

    let err = app
        .message_service()
        .send_message(mallory.id, send_dto(conversation_id, "let me in"))
        .await
        .unwrap_err();
    assert!(matches!(err, MessageError::NotParticipant));
}

#[tokio::test]
async fn edit_is_sender_only_and_broadcasts() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");
    let conversation_id = direct_conversation(&app, alice.id, bob.id).await;

    let message = app
        .message_service()
        .send_message(alice.id, send_dto(conversation_id, "draft"))
        .await
        .unwrap();

    let err = app
        .message_service()
        .edit_message(bob.id, message.id, "hijacked".into())
        .await
        .unwrap_err();
    assert!(matches!(err, MessageError::NotSender));

    let mut rx_bob = app.connect(bob.id);
    let edited = app
        .message_service()
        .edit_message(alice.id, message.id, "final".into())
        .await
        .unwrap();
    assert_eq!(edited.content, "final");
    assert!(edited.edited_at.is_some());

    let events = drain_events(&mut rx_bob);
    assert_eq!(events.len(), 1);
    match &events[0].event {
        ServerEvent::MessageEdited(payload) => {
            assert_eq!(payload.message_id, message.id);
            assert_eq!(payload.content, "final");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn soft_delete_scrubs_content_and_is_terminal() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");
    let conversation_id = direct_conversation(&app, alice.id, bob.id).await;

    let mut dto = send_dto(conversation_id, "incriminating");
    dto.file_url = Some("https://files.example/receipt.png".into());
    dto.file_type = Some("image/png".into());
    dto.file_name = Some("receipt.png".into());
    let message = app
        .message_service()
        .send_message(alice.id, dto)
        .await
        .unwrap();

    // Only the sender may delete
    let err = app
        .message_service()
        .delete_message(bob.id, message.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MessageError::NotSender));

    app.message_service()
        .delete_message(alice.id, message.id)
        .await
        .unwrap();

    let stored = app.store.messages.lock().get(&message.id).cloned().unwrap();
    assert!(stored.is_deleted);
    assert_eq!(stored.content, DELETED_PLACEHOLDER);
    assert_eq!(stored.file_url, None);
    assert_eq!(stored.file_type, None);
    assert_eq!(stored.file_name, None);

    // Deleted is terminal: no further edits or deletes
    let err = app
        .message_service()
        .edit_message(alice.id, message.id, "undo".into())
        .await
        .unwrap_err();
    assert!(matches!(err, MessageError::AlreadyDeleted));

    let err = app
        .message_service()
        .delete_message(alice.id, message.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MessageError::AlreadyDeleted));
}

#[tokio::test]
async fn mark_read_rejects_sender_and_advances_pointer() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");
    let conversation_id = direct_conversation(&app, alice.id, bob.id).await;

    let message = app
        .message_service()
        .send_message(alice.id, send_dto(conversation_id, "read me"))
        .await
        .unwrap();

    // A sender marking their own message is rejected
    let err = app
        .message_service()
        .mark_read(alice.id, message.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MessageError::OwnMessageRead));

    let mut rx_alice = app.connect(alice.id);
    let mut rx_bob = app.connect(bob.id);

    let read = app
        .message_service()
        .mark_read(bob.id, message.id)
        .await
        .unwrap();
    assert_eq!(read.read_by_user_id, Some(bob.id));
    assert!(read.read_at.is_some());
    assert_eq!(read.delivered_at, read.read_at);

    // The reader's per-conversation pointer advanced
    let pointer = app
        .store
        .participants
        .lock()
        .iter()
        .find(|p| p.conversation_id == conversation_id && p.user_id == bob.id)
        .and_then(|p| p.last_read_message_id);
    assert_eq!(pointer, Some(message.id));

    // Everyone but the reader sees the receipt
    assert_eq!(drain_event_names(&mut rx_alice), vec!["message_read"]);
    assert_eq!(drain_event_names(&mut rx_bob), Vec::<&str>::new());
}

#[tokio::test]
async fn reactions_are_idempotent_and_removable() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");
    let conversation_id = direct_conversation(&app, alice.id, bob.id).await;

    let message = app
        .message_service()
        .send_message(bob.id, send_dto(conversation_id, "pun"))
        .await
        .unwrap();

    let mut rx_bob = app.connect(bob.id);

    let first = app
        .reaction_service()
        .add_reaction(alice.id, message.id, "👍".into())
        .await
        .unwrap();
    let second = app
        .reaction_service()
        .add_reaction(alice.id, message.id, "👍".into())
        .await
        .unwrap();

    // Same stored row both times, and only one broadcast
    assert_eq!(first.id, second.id);
    assert_eq!(app.store.reactions.lock().len(), 1);
    assert_eq!(drain_event_names(&mut rx_bob), vec!["reaction_added"]);

    let summary = app
        .reaction_service()
        .summarize(alice.id, message.id)
        .await
        .unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].emoji, "👍");
    assert_eq!(summary[0].count, 1);
    assert!(summary[0].reacted_by_me);

    app.reaction_service()
        .remove_reaction(alice.id, message.id, "👍")
        .await
        .unwrap();
    assert_eq!(drain_event_names(&mut rx_bob), vec!["reaction_removed"]);

    // Removing again fails with NotFound and the summary is empty
    let err = app
        .reaction_service()
        .remove_reaction(alice.id, message.id, "👍")
        .await
        .unwrap_err();
    assert!(matches!(err, ReactionError::NotFound));

    let summary = app
        .reaction_service()
        .summarize(alice.id, message.id)
        .await
        .unwrap();
    assert!(summary.is_empty());
}

#[tokio::test]
async fn direct_conversations_are_unique_per_pair() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");

    let conversation_id = direct_conversation(&app, alice.id, bob.id).await;
    assert_eq!(
        app.store
            .participants
            .lock()
            .iter()
            .filter(|p| p.conversation_id == conversation_id)
            .count(),
        2
    );

    // Same pair from the other side is rejected without creating rows
    let err = app
        .conversation_service()
        .create_conversation(
            bob.id,
            CreateConversationDto {
                kind: ConversationKind::Direct,
                title: None,
                participant_ids: vec![alice.id],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConversationError::DirectExists));
    assert_eq!(app.store.conversations.lock().len(), 1);
}

#[tokio::test]
async fn group_cap_holds_for_single_and_batch_adds() {
    let app = TestApp::new();
    let creator = app.add_user("creator");

    // Creator plus 98 others: one seat left
    let others: Vec<Uuid> = (0..98)
        .map(|i| app.add_user(&format!("member{}", i)).id)
        .collect();
    let conversation_id = group_conversation(&app, creator.id, others).await;

    let last = app.add_user("last");
    app.make_friends(creator.id, last.id);
    app.conversation_service()
        .add_participant(creator.id, conversation_id, last.id)
        .await
        .unwrap();

    // The 101st member is rejected, batch included, before any insert
    let overflow_a = app.add_user("overflow_a");
    let overflow_b = app.add_user("overflow_b");
    app.make_friends(creator.id, overflow_a.id);
    app.make_friends(creator.id, overflow_b.id);

    let err = app
        .conversation_service()
        .add_participants_batch(
            creator.id,
            conversation_id,
            &[overflow_a.id, overflow_b.id],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConversationError::GroupFull));

    let count = app
        .store
        .participants
        .lock()
        .iter()
        .filter(|p| p.conversation_id == conversation_id)
        .count();
    assert_eq!(count, 100);
}

#[tokio::test]
async fn group_add_requires_accepted_friendship_with_creator() {
    let app = TestApp::new();
    let creator = app.add_user("creator");
    let member = app.add_user("member");
    let stranger = app.add_user("stranger");
    let conversation_id = group_conversation(&app, creator.id, vec![member.id]).await;

    let err = app
        .conversation_service()
        .add_participant(creator.id, conversation_id, stranger.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ConversationError::NotFriends));

    // Only the creator may add, friendship or not
    app.make_friends(member.id, stranger.id);
    let err = app
        .conversation_service()
        .add_participant(member.id, conversation_id, stranger.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ConversationError::NotCreator));

    let mut rx_member = app.connect(member.id);
    let mut rx_stranger = app.connect(stranger.id);

    app.make_friends(creator.id, stranger.id);
    app.conversation_service()
        .add_participant(creator.id, conversation_id, stranger.id)
        .await
        .unwrap();

    // Existing members see the system message, the new member receives the
    // conversation and is routed from now on
    assert_eq!(drain_event_names(&mut rx_member), vec!["new_message"]);
    assert_eq!(drain_event_names(&mut rx_stranger), vec!["new_conversation"]);
    assert!(app.router.directory().contains(stranger.id, conversation_id));
}

#[tokio::test]
async fn leaving_group_notifies_remaining_members_only() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");
    let carol = app.add_user("carol");
    let conversation_id = group_conversation(&app, alice.id, vec![bob.id, carol.id]).await;

    let mut rx_alice = app.connect(alice.id);
    let mut rx_bob = app.connect(bob.id);
    let mut rx_carol = app.connect(carol.id);
    drain_events(&mut rx_alice);
    drain_events(&mut rx_bob);
    drain_events(&mut rx_carol);

    app.conversation_service()
        .leave_conversation(alice.id, conversation_id)
        .await
        .unwrap();

    // B and C remain members and receive the system message; A does not
    let bob_events = drain_events(&mut rx_bob);
    assert_eq!(bob_events.len(), 1);
    match &bob_events[0].event {
        ServerEvent::NewMessage(payload) => {
            assert_eq!(payload.sender_id, None);
            assert_eq!(payload.message_type, "system");
            assert!(payload.content.contains("left the group"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(drain_event_names(&mut rx_carol), vec!["new_message"]);
    assert_eq!(drain_event_names(&mut rx_alice), Vec::<&str>::new());

    let remaining: Vec<Uuid> = app
        .store
        .participants
        .lock()
        .iter()
        .filter(|p| p.conversation_id == conversation_id)
        .map(|p| p.user_id)
        .collect();
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&alice.id));
}

#[tokio::test]
async fn group_of_two_auto_disbands_on_leave() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");
    let conversation_id = group_conversation(&app, alice.id, vec![bob.id]).await;

    let mut rx_bob = app.connect(bob.id);
    drain_events(&mut rx_bob);

    app.conversation_service()
        .leave_conversation(alice.id, conversation_id)
        .await
        .unwrap();

    // The last member is told the group disbanded
    let bob_events = drain_events(&mut rx_bob);
    assert_eq!(bob_events.len(), 1);
    match &bob_events[0].event {
        ServerEvent::NewMessage(payload) => {
            assert_eq!(payload.sender_id, None);
            assert!(payload.content.contains("disbanded"));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    // Conversation and its rows are gone
    let err = app
        .conversation_service()
        .get_conversation(bob.id, conversation_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ConversationError::NotFound));
    assert!(app.store.conversations.lock().is_empty());
    assert!(app.store.participants.lock().is_empty());
    assert!(app.store.messages.lock().is_empty());
}

#[tokio::test]
async fn unfriend_in_direct_keeps_the_conversation() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");
    app.make_friends(alice.id, bob.id);
    let conversation_id = direct_conversation(&app, alice.id, bob.id).await;

    app.conversation_service()
        .unfriend_in_direct(alice.id, conversation_id)
        .await
        .unwrap();

    assert!(app.store.friendships.lock().is_empty());
    assert!(app
        .store
        .conversations
        .lock()
        .contains_key(&conversation_id));
}

#[tokio::test]
async fn group_creation_requires_title() {
    let app = TestApp::new();
    let alice = app.add_user("alice");
    let bob = app.add_user("bob");

    let err = app
        .conversation_service()
        .create_conversation(
            alice.id,
            CreateConversationDto {
                kind: ConversationKind::Group,
                title: Some("   ".into()),
                participant_ids: vec![bob.id],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConversationError::TitleRequired));
}
