//! Config parsing, defaults and validation.

mod common;

use std::io::Write;

use streamrec::config::loader::{load_and_validate, load_or_default};
use streamrec::errors::RecorderError;
use streamrec::model::Hms;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn full_config_parses() {
    let file = write_config(
        r#"
[storage]
base_dir = "/tmp/streamrec-test"

[daemon]
wait = 1
threshold = 3

[recorder]
tick = 2
overextend = 5
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.base_dir(), std::path::Path::new("/tmp/streamrec-test"));
    assert!(cfg.video_dir().ends_with("videos"));

    let daemon = cfg.daemon_config();
    assert_eq!(daemon.wait.as_secs(), 1);
    assert_eq!(daemon.threshold.as_secs(), 3);

    let sup = cfg.supervisor_config(true);
    assert!(sup.wait_for_start_time);
    assert_eq!(sup.tick.as_secs(), 2);
    assert_eq!(sup.overextend.as_secs(), 5);
}

#[test]
fn empty_file_uses_defaults() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();

    let daemon = cfg.daemon_config();
    assert_eq!(daemon.wait.as_secs(), 2);
    assert_eq!(daemon.threshold.as_secs(), 4);

    let sup = cfg.supervisor_config(false);
    assert_eq!(sup.tick.as_secs(), 5);
    assert_eq!(sup.overextend.as_secs(), 10);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = load_or_default("/definitely/not/here/Streamrec.toml").unwrap();
    assert_eq!(cfg.daemon_config().wait.as_secs(), 2);
}

#[test]
fn wait_must_stay_below_threshold() {
    let file = write_config("[daemon]\nwait = 4\nthreshold = 4\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, RecorderError::Config(_)));
}

#[test]
fn zero_wait_is_rejected() {
    let file = write_config("[daemon]\nwait = 0\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, RecorderError::Config(_)));
}

#[test]
fn hms_parses_and_displays() {
    let hms: Hms = "1:30:05".parse().unwrap();
    assert_eq!(hms, Hms::new(1, 30, 5));
    assert_eq!(hms.to_string(), "01:30:05");
    assert_eq!(hms.total_seconds(), 5405);

    assert!("90".parse::<Hms>().is_err());
    assert!("0:99:00".parse::<Hms>().is_err());
    assert!("a:b:c".parse::<Hms>().is_err());

    assert_eq!(Hms::from_secs(5405), Hms::new(1, 30, 5));
}
