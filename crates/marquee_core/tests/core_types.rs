use marquee_core::{ConfigError, Direction, EntityId, HierarchyLevel, TimeWindow};

#[test]
fn hierarchy_levels_chain_to_top() {
    assert_eq!(HierarchyLevel::Top.parent_level(), None);
    assert_eq!(HierarchyLevel::Mid.parent_level(), Some(HierarchyLevel::Top));
    assert_eq!(HierarchyLevel::Leaf.parent_level(), Some(HierarchyLevel::Mid));
}

#[test]
fn entity_ids_order_lexically() {
    let mut ids: Vec<EntityId> = ["line-b", "line-a", "line-c"]
        .into_iter()
        .map(EntityId::from)
        .collect();
    ids.sort();
    let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
    assert_eq!(names, vec!["line-a", "line-b", "line-c"]);
}

#[test]
fn serde_uses_snake_case_identifiers() {
    let level: HierarchyLevel = serde_json::from_str("\"leaf\"").unwrap();
    assert_eq!(level, HierarchyLevel::Leaf);

    let dir: Direction = serde_json::from_str("\"up\"").unwrap();
    assert_eq!(dir, Direction::Up);

    let id: EntityId = serde_json::from_str("\"verse-1\"").unwrap();
    assert_eq!(id.as_str(), "verse-1");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"verse-1\"");
}

#[test]
fn padded_window_serializes_as_plain_bounds() {
    let window = TimeWindow::new(1000.0, 3000.0).padded(500.0, 500.0);
    let json = serde_json::to_value(window).unwrap();
    assert_eq!(json["start"], 500.0);
    assert_eq!(json["end"], 3500.0);
}

#[test]
fn config_errors_name_their_entity() {
    let err = ConfigError::MissingField {
        entity: EntityId::from("word-3"),
        field: "start_time",
    };
    assert_eq!(err.entity().as_str(), "word-3");
    assert_eq!(
        err.to_string(),
        "entity `word-3`: missing required field `start_time`"
    );

    let err = ConfigError::LevelMismatch {
        entity: EntityId::from("char-1"),
        level: HierarchyLevel::Leaf,
        parent_level: HierarchyLevel::Top,
    };
    assert!(err.to_string().contains("leaf entity cannot be nested under a top entity"));
}
