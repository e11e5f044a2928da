mod common;

use common::{describe, Sandbox};

#[test]
fn test_cache_clear_exits_zero_on_empty_dir() {
    let sb = Sandbox::new();
    let out = sb.run(&["cache-clear"]);
    assert!(out.status.success(), "{}", describe(&out));
    assert!(out.stdout.is_empty());
}

#[test]
fn test_cache_clear_removes_only_icon_caches() {
    let sb = Sandbox::new();
    let dir = sb.cache_dir();
    std::fs::write(dir.join("bitbucket-cache.json"), "{}").unwrap();
    std::fs::write(dir.join("bitbucket-cache.json.lock"), "").unwrap();
    std::fs::write(dir.join("jirateam-cache.json"), "{}").unwrap();
    std::fs::write(dir.join("notes.txt"), "keep").unwrap();

    let out = sb.run(&["cache-clear"]);
    assert!(out.status.success(), "{}", describe(&out));
    assert!(!dir.join("bitbucket-cache.json").exists());
    assert!(!dir.join("bitbucket-cache.json.lock").exists());
    assert!(!dir.join("jirateam-cache.json").exists());
    assert!(dir.join("notes.txt").exists());
}

#[test]
fn test_cache_dir_flag_overrides_env() {
    let sb = Sandbox::new();
    let other = sb.root.path().join("other");
    std::fs::create_dir_all(&other).unwrap();
    std::fs::write(other.join("jirateam-cache.json"), "{}").unwrap();
    std::fs::write(sb.cache_dir().join("jirateam-cache.json"), "{}").unwrap();

    let out = sb.run(&["cache-clear", "--cache-dir", other.to_str().unwrap()]);
    assert!(out.status.success(), "{}", describe(&out));
    assert!(!other.join("jirateam-cache.json").exists());
    assert!(sb.cache_dir().join("jirateam-cache.json").exists());
}
