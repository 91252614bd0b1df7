use crate::{MessageKind, Origin};

/// **VALUE**: Verifies that every kind round-trips through its wire tag.
///
/// **WHY THIS MATTERS**: The decoder looks kinds up by tag. A typo in one arm would make
/// that kind permanently "unknown" and silently ignored.
///
/// **BUG THIS CATCHES**: Would catch if `as_str` and `parse` drift apart.
#[test]
fn given_every_kind_when_parsing_its_tag_then_returns_same_kind() {
    for kind in MessageKind::ALL {
        assert_eq!(MessageKind::parse(kind.as_str()), Some(kind), "tag {kind}");
    }
}

/// **VALUE**: Verifies that tags outside the vocabulary are not an error.
///
/// **BUG THIS CATCHES**: Would catch if unknown tags mapped onto a real kind.
#[test]
fn given_unknown_tag_when_parsing_then_returns_none() {
    assert_eq!(MessageKind::parse("audio_level"), None);
    assert_eq!(MessageKind::parse(""), None);
    assert_eq!(MessageKind::parse("HEARTBEAT"), None);
}

/// **VALUE**: Verifies the direction table of the vocabulary.
///
/// **WHY THIS MATTERS**: `log_entry` and `heartbeat` travel both ways, commands only
/// go to the core.
#[test]
fn given_kinds_when_checking_direction_then_matches_vocabulary() {
    assert!(MessageKind::WakeWordDetected.from_core());
    assert!(!MessageKind::WakeWordDetected.from_client());
    assert!(MessageKind::UserInput.from_client());
    assert!(!MessageKind::UserInput.from_core());
    assert!(MessageKind::Heartbeat.from_core() && MessageKind::Heartbeat.from_client());
    assert!(MessageKind::LogEntry.from_core() && MessageKind::LogEntry.from_client());
}

/// **VALUE**: Verifies the legacy producer names are accepted as origins.
///
/// **BUG THIS CATCHES**: Would catch if frames from an older core (`source: "python"`)
/// lost their origin.
#[test]
fn given_legacy_source_names_when_parsing_origin_then_maps_to_core_and_client() {
    assert_eq!(Origin::parse("python"), Some(Origin::Core));
    assert_eq!(Origin::parse("core"), Some(Origin::Core));
    assert_eq!(Origin::parse("electron"), Some(Origin::Client));
    assert_eq!(Origin::parse("client"), Some(Origin::Client));
    assert_eq!(Origin::parse("browser"), None);
}
