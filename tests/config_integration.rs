use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use strokewarden::config::Config;
use strokewarden::daemon::Daemon;
use strokewarden::grab::GrabMode;
use strokewarden::platform::feed::parse_line;
use strokewarden::platform::{HeadlessPlatform, Injected};

const CONFIG: &str = r#"
[gestures]
buttons = [{ button = 2 }]

[[binding]]
name = "Volume up"
points = [[0.0, 200.0], [0.0, 100.0], [0.0, 0.0]]
action = { type = "send_key", key = 123 }
action_modifiers = ["shift"]

[[binding]]
name = "Middle click"
completion = 0
action = { type = "click" }
"#;

const FEED: &str = r#"
# upward stroke with the middle button
{"type":"press","button":2,"x":400,"y":400}
{"type":"motion","x":400,"y":370}
{"type":"motion","x":400,"y":320}
{"type":"motion","x":400,"y":260}
{"type":"release","button":2,"x":400,"y":200}
"#;

fn load(dir: &TempDir) -> Config {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    Config::load(&path).unwrap()
}

#[test]
fn test_feed_stroke_sends_key_with_modifier() {
    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    assert_eq!(config.action_db().len(), 2);

    let platform = Rc::new(HeadlessPlatform::new());
    let mut daemon = Daemon::new(&config, platform.clone()).unwrap();

    let t0 = Instant::now();
    for (i, line) in FEED.lines().enumerate() {
        let Some(event) = parse_line(line).unwrap() else {
            continue;
        };
        let event = event.into_event(t0 + Duration::from_millis(10 * i as u64)).unwrap();
        daemon.dispatcher_mut().handle_event(event).unwrap();
    }

    assert!(daemon.dispatcher().is_idle());
    assert_eq!(daemon.dispatcher().context().grabber.mode(), GrabMode::Button);
    assert_eq!(
        platform.injected(),
        vec![
            Injected::Key { keycode: 50, pressed: true },
            Injected::Key { keycode: 123, pressed: true },
            Injected::Key { keycode: 123, pressed: false },
            Injected::Key { keycode: 50, pressed: false },
        ]
    );
}

#[test]
fn test_click_template_replays_click() {
    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let platform = Rc::new(HeadlessPlatform::new());
    let mut daemon = Daemon::new(&config, platform.clone()).unwrap();

    let t0 = Instant::now();
    for (i, line) in [
        r#"{"type":"press","button":2,"x":10,"y":20}"#,
        r#"{"type":"release","button":2,"x":12,"y":20}"#,
    ]
    .iter()
    .enumerate()
    {
        let event = parse_line(line).unwrap().unwrap();
        let event = event.into_event(t0 + Duration::from_millis(20 * i as u64)).unwrap();
        daemon.dispatcher_mut().handle_event(event).unwrap();
    }

    assert_eq!(
        platform.injected(),
        vec![
            Injected::Motion { x: 10.0, y: 20.0 },
            Injected::Button { button: 2, pressed: true },
            Injected::Button { button: 2, pressed: false },
        ]
    );
    assert_eq!(daemon.dispatcher().context().grabber.suspend_depth(), 0);
}

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let result = Config::load(&dir.path().join("nope.toml"));
    assert!(result.is_err());

    let config = Config::default_config();
    let platform = Rc::new(HeadlessPlatform::new());
    let daemon = Daemon::new(&config, platform).unwrap();
    assert_eq!(daemon.dispatcher().state_names(), vec!["Idle"]);
}
