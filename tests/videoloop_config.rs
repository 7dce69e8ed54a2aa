use std::io::Write;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use videoloop::config::VideoLoopConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "VIDEOLOOP_CONFIG",
        "VIDEOLOOP_SOURCE",
        "VIDEOLOOP_OUTPUT",
        "VIDEOLOOP_FOURCC",
        "VIDEOLOOP_MAX_FRAMES",
        "VIDEOLOOP_EXIT_KEY",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": "resources/walking.avi",
        "output": "output/from-file",
        "fourcc": "MJPG",
        "window_title": "Lobby",
        "max_frames": 500,
        "sequence_fps": 12.5,
        "canny": { "low_threshold": 60.0, "high_threshold": 120.0 },
        "motion": { "threshold": 40, "trigger_percent": 2.0 }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("VIDEOLOOP_CONFIG", file.path());
    std::env::set_var("VIDEOLOOP_SOURCE", "stub://gradient?frames=10");
    std::env::set_var("VIDEOLOOP_MAX_FRAMES", "25");
    std::env::set_var("VIDEOLOOP_EXIT_KEY", "113");

    let cfg = VideoLoopConfig::load().expect("load config");

    assert_eq!(cfg.source.as_deref(), Some("stub://gradient?frames=10"));
    assert_eq!(cfg.output.unwrap().to_str(), Some("output/from-file"));
    assert_eq!(cfg.fourcc.to_string(), "MJPG");
    assert_eq!(cfg.window_title, "Lobby");
    assert_eq!(cfg.max_frames, Some(25));
    assert_eq!(cfg.exit_key, 113);
    assert_eq!(cfg.sequence_fps, 12.5);
    assert_eq!(cfg.canny.low_threshold, 60.0);
    assert_eq!(cfg.canny.high_threshold, 120.0);
    assert_eq!(cfg.canny.blur_kernel, 3);
    assert_eq!(cfg.motion.threshold, 40);
    assert_eq!(cfg.motion.trigger_percent, 2.0);
    assert_eq!(cfg.motion.reset_percent, 25.0);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
        fourcc = "XVID"
        exit_key = 32

        [motion]
        alpha = 0.1
    "#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("VIDEOLOOP_CONFIG", file.path());

    let cfg = VideoLoopConfig::load().expect("load config");
    assert_eq!(cfg.fourcc.to_string(), "XVID");
    assert_eq!(cfg.exit_key, 32);
    assert!((cfg.motion.alpha - 0.1).abs() < 1e-6);
    assert_eq!(cfg.source, None);

    clear_env();
}

#[test]
fn defaults_apply_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = VideoLoopConfig::load().expect("load config");
    assert_eq!(cfg.fourcc.to_string(), "DIVX");
    assert_eq!(cfg.exit_key, 27);
    assert_eq!(cfg.max_frames, None);
    assert_eq!(cfg.output, None);
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("VIDEOLOOP_FOURCC", "DIVX2");
    assert!(VideoLoopConfig::load().is_err());
    clear_env();

    std::env::set_var("VIDEOLOOP_MAX_FRAMES", "many");
    assert!(VideoLoopConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "canny": { "blur_kernel": 4 } }"#)
        .expect("write config");
    std::env::set_var("VIDEOLOOP_CONFIG", file.path());
    assert!(VideoLoopConfig::load().is_err());
    clear_env();

    let missing = std::env::temp_dir().join("videoloop-missing-config.json");
    std::env::set_var("VIDEOLOOP_CONFIG", &missing);
    assert!(VideoLoopConfig::load().is_err());
    clear_env();
}
