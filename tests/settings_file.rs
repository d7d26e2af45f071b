use ink_layers::browser::ContentSource;
use ink_layers::ink::capture::CommitMode;
use ink_layers::ink::model::PointerFilter;
use ink_layers::settings::Settings;
use ink_layers::surface::UnmatchedInput;
use std::fs;
use tempfile::tempdir;

#[test]
fn missing_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ink_layers.json");

    let settings = Settings::load(path.to_str().unwrap()).unwrap();

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.title, "Three-Layer Note-Taking Demo");
    assert_eq!(settings.window_size(), (1024, 768));
}

#[test]
fn empty_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ink_layers.json");
    fs::write(&path, "  \n").unwrap();

    let settings = Settings::load(path.to_str().unwrap()).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn partial_file_overrides_only_named_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ink_layers.json");
    fs::write(
        &path,
        r#"{
            "pointer_filter": "pen_and_touch",
            "unmatched_input": "click_through",
            "content": { "kind": "url", "value": "https://example.com/" }
        }"#,
    )
    .unwrap();

    let settings = Settings::load(path.to_str().unwrap()).unwrap();

    assert_eq!(settings.pointer_filter, PointerFilter::PenAndTouch);
    assert_eq!(settings.unmatched_input, UnmatchedInput::ClickThrough);
    assert_eq!(
        settings.content,
        ContentSource::Url("https://example.com/".into())
    );
    assert_eq!(settings.commit_mode, CommitMode::Commit);
    assert!(settings.show_init_errors);
}

#[test]
fn save_then_load_keeps_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ink_layers.json");
    let path = path.to_str().unwrap();

    let settings = Settings {
        commit_mode: CommitMode::Discard,
        min_point_distance: 4,
        log_file: Some("ink.log".into()),
        ..Settings::default()
    };
    settings.save(path).unwrap();

    assert_eq!(Settings::load(path).unwrap(), settings);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ink_layers.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(Settings::load(path.to_str().unwrap()).is_err());
}
