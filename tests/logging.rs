use std::{fs, thread::sleep, time::Duration};

use tempfile::tempdir;

#[test]
fn writes_log_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ink.log");

    ink_layers::logging::init(true, Some(path.clone()));
    tracing::info!("stroke committed");

    sleep(Duration::from_millis(200));

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("stroke committed"));
}
