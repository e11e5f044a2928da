mod common;

use mockito::Matcher;

use common::{describe, stdout, Sandbox};

#[test]
fn test_unreachable_host_prints_blank_menu() {
    let sb = Sandbox::new();
    // Nothing listens on the discard port.
    let out = sb
        .command()
        .arg("bitbucket")
        .env("BITBUCKET_HOST", "http://127.0.0.1:9")
        .env("BITBUCKET_AUTH", "me:token")
        .output()
        .expect("run argos-menus");
    assert!(out.status.success(), "{}", describe(&out));
    assert_eq!(stdout(&out), " \n");
}

fn inbox_page(host: &str) -> String {
    format!(
        r#"{{"values":[{{
            "title":"[UNTY-12] Add retry to uploads",
            "description":"Adds **retry**",
            "author":{{"user":{{"name":"alice","displayName":"Alice Smith","avatarUrl":"/users/alice/avatar.png"}},"status":"UNAPPROVED"}},
            "reviewers":[],
            "links":{{"self":[{{"href":"{host}/projects/P/repos/r/pull-requests/12"}}]}},
            "fromRef":{{"displayId":"feature/retry"}},
            "toRef":{{"displayId":"main"}},
            "properties":{{"mergeResult":{{"outcome":"CONFLICTED"}}}}
        }}]}}"#
    )
}

#[test]
fn test_inbox_menu_with_cached_avatar() {
    let mut server = mockito::Server::new();
    let host = server.url();
    let author = server
        .mock("GET", "/rest/api/latest/inbox/pull-requests")
        .match_query(Matcher::UrlEncoded("role".into(), "AUTHOR".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(inbox_page(&host))
        .create();
    let reviewer = server
        .mock("GET", "/rest/api/latest/inbox/pull-requests")
        .match_query(Matcher::UrlEncoded("role".into(), "REVIEWER".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"values":[]}"#)
        .create();
    let avatar = server
        .mock("GET", "/users/alice/avatar.png")
        .with_status(200)
        .with_body(b"AVATAR")
        .expect(1)
        .create();

    let sb = Sandbox::new();
    let out = sb
        .command()
        .arg("bitbucket")
        .env("BITBUCKET_HOST", &host)
        .env("BITBUCKET_AUTH", "me:token")
        .output()
        .expect("run argos-menus");
    author.assert();
    reviewer.assert();
    avatar.assert();
    assert!(out.status.success(), "{}", describe(&out));
    assert_eq!(
        stdout(&out),
        format!(
            "1 PR\n---\n[UNTY-12] Add retry to uploads\\n<span color=\"#999\"><small>feature/retry → main - <span color=\"#a70\">conflict</span></small></span> | href={host}/projects/P/repos/r/pull-requests/12 image=QVZBVEFS\nGo to Bitbucket | href={host}\n"
        )
    );

    let raw = std::fs::read_to_string(sb.cache_dir().join("bitbucket-cache.json"))
        .expect("cache file written");
    let cache: serde_json::Value = serde_json::from_str(&raw).expect("cache is valid JSON");
    assert_eq!(cache["alice"], "QVZBVEFS");
}

#[test]
fn test_inbox_error_payload_is_err_block() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/rest/api/latest/inbox/pull-requests")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"errors":[{"message":"Authentication failed. Please check your credentials and try again."}]}"#)
        .create();

    let sb = Sandbox::new();
    let out = sb
        .command()
        .arg("bitbucket")
        .env("BITBUCKET_HOST", server.url())
        .env("BITBUCKET_AUTH", "me:wrong")
        .output()
        .expect("run argos-menus");
    assert_eq!(out.status.code(), Some(1), "{}", describe(&out));
    assert_eq!(
        stdout(&out),
        "Err\n---\nAuthentication failed. Please check your credentials and try again.\n"
    );
}
