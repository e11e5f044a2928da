#![cfg(unix)]

mod common;

use common::{describe, stdout, Sandbox};

#[test]
fn test_radio_title_shows_playing_station() {
    let sb = Sandbox::new();
    sb.fake_program(
        "ps",
        "printf '  PID TTY STAT TIME COMMAND\\n 4242 ? Sl 0:12 vlc -I dummy http://69.46.75.98/\\n'",
    );
    let out = sb.run(&["radio"]);
    assert!(out.status.success(), "{}", describe(&out));
    let text = stdout(&out);
    assert!(text.starts_with("Idobi Alt\n---\n"), "{text}");
    assert!(text.ends_with("---\nStop Playback | terminal=false bash=\"killall vlc\"\n"), "{text}");
}

#[test]
fn test_radio_stations_from_config_dir() {
    let sb = Sandbox::new();
    sb.fake_program("ps", "exit 0");
    std::fs::write(
        sb.config_dir().join("stations.yaml"),
        "- name: Jazz FM\n  url: http://jazz.example/stream\n",
    )
    .expect("write stations");
    let out = sb.run(&["radio"]);
    assert!(out.status.success(), "{}", describe(&out));
    assert_eq!(
        stdout(&out),
        "Radio\n---\nJazz FM | terminal=false bash=\"killall vlc; vlc -I dummy http://jazz.example/stream\"\n---\nStop Playback | terminal=false bash=\"killall vlc\"\n"
    );
}

#[test]
fn test_radio_ignores_broken_keystore() {
    let sb = Sandbox::new();
    sb.write_keystore("[1, 2");
    sb.fake_program("ps", "exit 0");
    let out = sb.run(&["radio"]);
    assert!(out.status.success(), "{}", describe(&out));
    assert!(stdout(&out).starts_with("Radio\n---\n90.5 WBER"), "{}", describe(&out));
}
