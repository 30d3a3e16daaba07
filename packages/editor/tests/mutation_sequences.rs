//! Mutation sequences through the session:
//! - Undo restores the pre-mutation tree, redo the post-mutation tree
//! - History stays bounded over long sequences
//! - Redo branch is dropped by a new mutation

use article_editor::{
    BlockContent, BlockType, Direction, EditorConfig, EditorSession, ManualClock, MemoryStorage,
    Mutation,
};

fn session_with_capacity(capacity: usize) -> EditorSession {
    let config = EditorConfig {
        history_capacity: capacity,
        ..EditorConfig::default()
    };
    EditorSession::open(
        &config,
        Box::new(MemoryStorage::new()),
        Box::new(ManualClock::new()),
    )
}

/// A small tree with a container so nested mutations have somewhere to go
fn seeded() -> (EditorSession, Vec<String>) {
    let mut session = EditorSession::in_memory();
    let heading = session.add_block(BlockType::H2, None).unwrap();
    let paragraph = session.add_block(BlockType::Paragraph, None).unwrap();
    let section = session.add_block(BlockType::Section, None).unwrap();
    let child = session.add_child_block(&section, BlockType::List).unwrap();
    (session, vec![heading, paragraph, section, child])
}

#[test]
fn test_undo_redo_is_inverse_for_every_mutation() {
    // Built per session: ids are seeded per session
    let builders: [fn(&[String]) -> Mutation; 9] = [
        |_| Mutation::Insert {
            block_type: BlockType::Quote,
            position: Some(1),
        },
        |ids| Mutation::AddChild {
            parent_id: ids[2].clone(),
            block_type: BlockType::Image,
        },
        |ids| Mutation::UpdateContent {
            id: ids[1].clone(),
            content: Some(BlockContent::Text("Body".to_string())),
        },
        |ids| Mutation::UpdateStyle {
            id: ids[3].clone(),
            key: "color".to_string(),
            value: "#333".to_string(),
        },
        |ids| Mutation::Delete { id: ids[2].clone() },
        |ids| Mutation::Move {
            id: ids[1].clone(),
            direction: Direction::Up,
        },
        |ids| Mutation::Reorder {
            active_id: ids[2].clone(),
            over_id: ids[0].clone(),
        },
        |ids| Mutation::Duplicate { id: ids[2].clone() },
        |ids| Mutation::ChangeType {
            id: ids[0].clone(),
            new_type: BlockType::H4,
        },
    ];

    for build in builders {
        let (mut session, ids) = seeded();
        let mutation = build(&ids);

        let before = session.blocks().to_vec();
        session
            .apply(mutation.clone())
            .unwrap_or_else(|e| panic!("{} failed: {e}", mutation.name()));
        let after = session.blocks().to_vec();
        assert_ne!(before, after, "{} changed nothing", mutation.name());

        assert!(session.undo());
        assert_eq!(session.blocks(), before.as_slice(), "undo of {}", mutation.name());

        assert!(session.redo());
        assert_eq!(session.blocks(), after.as_slice(), "redo of {}", mutation.name());
    }
}

#[test]
fn test_history_bound_over_long_sequence() {
    let mut session = EditorSession::in_memory();
    let mut states = vec![session.blocks().to_vec()];

    for _ in 0..60 {
        session.add_block(BlockType::Paragraph, None).unwrap();
        states.push(session.blocks().to_vec());
        assert!(session.history().len() <= 50);
    }
    assert_eq!(session.history().len(), 50);

    let mut undone = 0;
    while session.undo() {
        undone += 1;
    }
    assert_eq!(undone, 49);

    // The oldest retained snapshot holds 11 blocks, never fewer
    assert_eq!(session.blocks(), states[11].as_slice());
    assert_eq!(session.blocks().len(), 11);
}

#[test]
fn test_custom_capacity() {
    let mut session = session_with_capacity(3);
    for _ in 0..5 {
        session.add_block(BlockType::Divider, None);
    }
    assert_eq!(session.history().len(), 3);
    assert!(session.undo());
    assert!(session.undo());
    assert!(!session.undo());
    assert_eq!(session.blocks().len(), 3);
}

#[test]
fn test_mutation_after_undo_drops_redo() {
    let mut session = EditorSession::in_memory();
    session.add_block(BlockType::H1, None);
    session.add_block(BlockType::Paragraph, None);

    session.undo();
    assert!(session.can_redo());

    session.add_block(BlockType::Code, None);
    assert!(!session.can_redo());
    assert_eq!(session.blocks()[1].block_type, BlockType::Code);
}

#[test]
fn test_noops_leave_history_alone() {
    let (mut session, ids) = seeded();
    let levels = session.history().undo_levels();

    assert!(!session.move_block(&ids[0], Direction::Up));
    assert!(!session.move_block(&ids[2], Direction::Down));
    assert!(!session.delete_block("gone"));
    assert!(session.add_child_block(&ids[1], BlockType::Paragraph).is_none());
    assert!(!session.change_block_type(&ids[3], BlockType::H1));

    assert_eq!(session.history().undo_levels(), levels);
    assert_eq!(session.noop_count(), 5);
}

#[test]
fn test_move_then_delete_then_undo_chain() {
    let (mut session, ids) = seeded();

    session.move_block(&ids[2], Direction::Up);
    session.delete_block(&ids[0]);
    session.duplicate_block(&ids[2]).unwrap();

    let order: Vec<_> = session.blocks().iter().map(|b| b.block_type).collect();
    assert_eq!(order, vec![BlockType::Section, BlockType::Section, BlockType::Paragraph]);

    session.undo();
    session.undo();
    session.undo();
    let order: Vec<_> = session.blocks().iter().map(|b| b.id.as_str()).collect();
    assert_eq!(order, vec![ids[0].as_str(), ids[1].as_str(), ids[2].as_str()]);
}
