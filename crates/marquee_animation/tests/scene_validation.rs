use marquee_animation::{Easing, EngineConfig, EntityConfig, EntitySpec, Scene, TimelineCoordinator};
use marquee_core::{ConfigError, EntityId, HierarchyLevel};

fn top(id: &str) -> EntityConfig {
    EntityConfig::top(id, 1000.0, 2000.0)
        .with_head(200.0)
        .with_tail(200.0)
        .with_speeds(2.0, 0.5)
}

fn error_of(scene: &Scene, id: &str) -> ConfigError {
    scene
        .get(id)
        .unwrap()
        .spec
        .clone()
        .expect_err("entity should be invalid")
}

#[test]
fn valid_records_become_tagged_specs() {
    let config = EngineConfig::default();
    let scene = Scene::build(
        [
            top("verse"),
            EntityConfig::group("word", "verse", 0.0, 500.0),
            EntityConfig::leaf("char", "word", 0.0, 100.0),
        ],
        &config,
    );
    assert_eq!(scene.len(), 3);
    assert_eq!(scene.errors().count(), 0);
    assert!(matches!(scene.get("verse").unwrap().spec, Ok(EntitySpec::Top(_))));
    assert!(matches!(scene.get("word").unwrap().spec, Ok(EntitySpec::Group(_))));
    assert!(matches!(scene.get("char").unwrap().spec, Ok(EntitySpec::Leaf(_))));

    let verse = scene.get("verse").unwrap();
    assert_eq!(verse.children.len(), 1);
    let word = scene.node(verse.children[0]).unwrap();
    assert_eq!(word.id.as_str(), "word");
    assert_eq!(scene.node(word.parent.unwrap()).unwrap().id.as_str(), "verse");
}

#[test]
fn top_level_requires_timing_and_speeds() {
    let config = EngineConfig::default();
    let scene = Scene::build(
        [
            EntityConfig::top("no-head", 0.0, 10.0).with_tail(1.0).with_speeds(1.0, 1.0),
            EntityConfig::top("no-speed", 0.0, 10.0).with_head(1.0).with_tail(1.0),
            EntityConfig {
                end_time: None,
                ..top("no-end")
            },
            EntityConfig {
                final_speed: None,
                ..top("half-speed")
            },
        ],
        &config,
    );
    assert!(matches!(
        error_of(&scene, "no-head"),
        ConfigError::MissingField { field: "head_time", .. }
    ));
    assert!(matches!(
        error_of(&scene, "no-speed"),
        ConfigError::MissingField { field: "initial_speed", .. }
    ));
    assert!(matches!(
        error_of(&scene, "no-end"),
        ConfigError::MissingField { field: "end_time", .. }
    ));
    assert!(matches!(
        error_of(&scene, "half-speed"),
        ConfigError::MissingField { field: "final_speed", .. }
    ));
}

#[test]
fn out_of_range_values_are_rejected() {
    let config = EngineConfig::default();
    let scene = Scene::build(
        [
            EntityConfig::top("inverted", 2000.0, 1000.0)
                .with_head(1.0)
                .with_tail(1.0)
                .with_speeds(1.0, 1.0),
            top("negative-head").with_head(-5.0),
            top("zero-slices").with_slices(0),
            top("zero-lines").with_max_lines(0),
            top("nan-speed").with_speeds(f64::NAN, 1.0),
        ],
        &config,
    );
    assert!(matches!(
        error_of(&scene, "inverted"),
        ConfigError::InvertedWindow { .. }
    ));
    for id in ["negative-head", "zero-slices", "zero-lines", "nan-speed"] {
        assert!(
            matches!(error_of(&scene, id), ConfigError::InvalidField { .. }),
            "{id}"
        );
    }
}

#[test]
fn hierarchy_errors_are_detected() {
    let config = EngineConfig::default();
    let scene = Scene::build(
        [
            top("verse"),
            top("adopted").with_rotation(0.0),
            EntityConfig {
                parent: Some(EntityId::from("verse")),
                ..top("top-with-parent")
            },
            EntityConfig {
                parent: None,
                ..EntityConfig::group("orphan", "x", 0.0, 1.0)
            },
            EntityConfig::group("lost", "nowhere", 0.0, 1.0),
            EntityConfig::leaf("skipping", "verse", 0.0, 1.0),
            top("verse"),
        ],
        &config,
    );
    assert!(matches!(
        error_of(&scene, "top-with-parent"),
        ConfigError::UnexpectedParent { .. }
    ));
    assert!(matches!(
        error_of(&scene, "orphan"),
        ConfigError::MissingParent { level: HierarchyLevel::Mid, .. }
    ));
    assert!(matches!(
        error_of(&scene, "lost"),
        ConfigError::UnknownParent { .. }
    ));
    assert!(matches!(
        error_of(&scene, "skipping"),
        ConfigError::LevelMismatch {
            level: HierarchyLevel::Leaf,
            parent_level: HierarchyLevel::Top,
            ..
        }
    ));
    assert!(scene
        .errors()
        .any(|e| matches!(e, ConfigError::DuplicateId(id) if id.as_str() == "verse")));
    assert!(scene.get("adopted").unwrap().spec.is_ok());
}

#[test]
fn invalid_entity_is_skipped_with_its_subtree_only() {
    let config = EngineConfig::default();
    let scene = Scene::build(
        [
            top("good"),
            EntityConfig::group("good-word", "good", 0.0, 500.0),
            EntityConfig {
                head_time: None,
                ..top("broken")
            },
            EntityConfig::group("broken-word", "broken", 0.0, 500.0),
            EntityConfig::leaf("broken-char", "broken-word", 0.0, 100.0),
            EntityConfig::group("bad-word", "good", 0.0, 500.0).with_slices(0),
            EntityConfig::leaf("bad-char", "bad-word", 0.0, 100.0),
        ],
        &config,
    );

    let mut timeline = TimelineCoordinator::new(config);
    let frame = timeline.evaluate(&scene, 1500.0);

    assert!(frame.get("good").is_some());
    assert!(frame.get("good-word").is_some());
    for id in ["broken", "broken-word", "broken-char", "bad-word", "bad-char"] {
        assert!(frame.get(id).is_none(), "{id} should be omitted");
    }
    // Only subtree roots are reported
    assert!(frame.is_skipped("broken"));
    assert!(frame.is_skipped("bad-word"));
    assert!(!frame.is_skipped("broken-char"));
    assert_eq!(timeline.stats().skipped, 2);
}

#[test]
fn unusable_easing_is_rejected() {
    let config = EngineConfig::default();
    let scene = Scene::build(
        [
            top("infinite").with_easing(Easing::CubicBezier(0.25, f64::INFINITY, 0.25, 1.0)),
            top("backwards").with_easing(Easing::CubicBezier(1.5, 0.0, 0.5, 1.0)),
            top("overshoot").with_easing(Easing::CubicBezier(0.3, 1.6, 0.6, 1.0)),
            EntityConfig::group("fine-word", "overshoot", 0.0, 500.0),
            EntityConfig::group("nan-word", "overshoot", 0.0, 500.0)
                .with_easing(Easing::CubicBezier(0.25, 0.1, f64::NAN, 1.0)),
        ],
        &config,
    );
    for id in ["infinite", "backwards", "nan-word"] {
        assert!(
            matches!(
                error_of(&scene, id),
                ConfigError::InvalidField { field: "easing", .. }
            ),
            "{id}"
        );
    }
    assert!(scene.get("overshoot").unwrap().spec.is_ok());

    let mut timeline = TimelineCoordinator::new(config);
    let first = timeline.evaluate(&scene, 700.0);
    let again = timeline.evaluate(&scene, 700.0);
    assert_eq!(first, again);
    assert!(first.is_skipped("infinite"));
    assert!(first.is_skipped("nan-word"));
    for instruction in &first.instructions {
        assert!((0.0..=1.0).contains(&instruction.alpha));
        assert!(instruction.position.x.is_finite() && instruction.position.y.is_finite());
    }
}

#[test]
fn unusable_default_easing_rejects_entities_relying_on_it() {
    let config = EngineConfig {
        easing: Easing::CubicBezier(0.25, f64::NAN, 0.25, 1.0),
        ..EngineConfig::default()
    };
    let scene = Scene::build(
        [
            top("inherits"),
            top("explicit").with_easing(Easing::EaseOutCubic),
        ],
        &config,
    );
    assert!(matches!(
        error_of(&scene, "inherits"),
        ConfigError::InvalidField { field: "easing", .. }
    ));
    assert!(scene.get("explicit").unwrap().spec.is_ok());
}

#[test]
fn entity_records_parse_from_toml() {
    #[derive(serde::Deserialize)]
    struct Doc {
        entity: Vec<EntityConfig>,
    }

    let doc: Doc = toml::from_str(
        r#"
        [[entity]]
        id = "verse"
        start_time = 1000.0
        end_time = 3000.0
        head_time = 500.0
        tail_time = 500.0
        initial_speed = 4.0
        final_speed = 0.1
        direction = "up"
        easing = "ease_out_quart"

        [[entity]]
        id = "word"
        level = "mid"
        parent = "verse"
        start_time = 0.0
        end_time = 800.0
        "#,
    )
    .unwrap();

    let scene = Scene::build(doc.entity, &EngineConfig::default());
    assert_eq!(scene.errors().count(), 0);
    assert_eq!(scene.get("word").unwrap().level, HierarchyLevel::Mid);
}
