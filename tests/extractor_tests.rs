//! Extraction state machine behavior: liveness under total failure, artifact
//! persistence, and redirect handling.

mod common;

use std::sync::Arc;

use common::{
    FailingSession, StubDownloader, StubSession, element_with_attrs, fast_extractor_config,
    text_element,
};
use feedscrape::extractor::{extract_post, selectors};
use feedscrape::identity::PostLink;
use feedscrape::session::SessionPair;
use tempfile::TempDir;

fn pair(primary: impl feedscrape::Session + 'static, alternate: impl feedscrape::Session + 'static) -> SessionPair {
    SessionPair {
        primary: Arc::new(primary),
        alternate: Arc::new(alternate),
    }
}

fn text_link() -> PostLink {
    PostLink {
        id: "1234567890".into(),
        url: "https://www.example.com/somepage/posts/1234567890".into(),
    }
}

#[tokio::test]
async fn reaches_a_terminal_outcome_when_every_stage_fails() {
    let tmp = TempDir::new().unwrap();
    let sessions = pair(FailingSession::new(), FailingSession::new());
    let downloader = StubDownloader::failing();
    let link = text_link();

    let outcome = extract_post(
        &sessions,
        &downloader,
        &link,
        tmp.path(),
        &fast_extractor_config(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.id, link.id);
    assert!(!outcome.success);
    assert_eq!(outcome.reason, "no artifacts extracted");
    assert!(!tmp.path().join("caption.txt").exists());
    assert!(!tmp.path().join("comments.txt").exists());
}

#[tokio::test]
async fn caption_is_persisted_and_deduplicated() {
    let tmp = TempDir::new().unwrap();
    let primary = StubSession::new().with(
        selectors::CAPTION_BLOCKS,
        vec![
            text_element("Spring opening hours\nSpring opening hours\nLike"),
            text_element("Spring opening hours"),
        ],
    );
    let sessions = pair(primary, StubSession::new());
    let downloader = StubDownloader::failing();
    let link = text_link();

    let outcome = extract_post(
        &sessions,
        &downloader,
        &link,
        tmp.path(),
        &fast_extractor_config(),
    )
    .await
    .unwrap();

    assert!(outcome.success, "a caption artifact means success");
    assert!(outcome.reason.starts_with("partial"), "image and comment stages degraded");
    let caption = std::fs::read_to_string(tmp.path().join("caption.txt")).unwrap();
    assert_eq!(caption, "Spring opening hours\n");
}

#[tokio::test]
async fn redirect_away_from_content_fails_the_item() {
    let tmp = TempDir::new().unwrap();
    let primary = StubSession::new().redirecting_to("https://www.example.com/login/");
    let sessions = pair(primary, StubSession::new());
    let downloader = StubDownloader::failing();
    let link = text_link();

    let outcome = extract_post(
        &sessions,
        &downloader,
        &link,
        tmp.path(),
        &fast_extractor_config(),
    )
    .await
    .unwrap();

    assert!(!outcome.success);
    assert!(
        outcome.reason.contains("redirected"),
        "reason should explain the redirect: {}",
        outcome.reason
    );
}

#[tokio::test]
async fn video_media_is_downloaded_from_the_alternate_view() {
    let tmp = TempDir::new().unwrap();
    let primary = StubSession::new().with(
        selectors::VIDEO_PROBE,
        vec![text_element("")],
    );
    let alternate = StubSession::new().with(
        selectors::VIDEO_SOURCES,
        vec![element_with_attrs(
            "",
            &[("src", "https://cdn.example.com/v/987.mp4")],
        )],
    );
    let sessions = pair(primary, alternate);
    let downloader = StubDownloader::saving();
    let link = PostLink {
        id: "987654321".into(),
        url: "https://www.example.com/somepage/videos/987654321".into(),
    };

    let outcome = extract_post(
        &sessions,
        &downloader,
        &link,
        tmp.path(),
        &fast_extractor_config(),
    )
    .await
    .unwrap();

    assert!(outcome.success);
    let media = tmp.path().join("video_1.mp4");
    assert!(media.exists(), "video_1.mp4 should have been written");
    assert!(std::fs::metadata(&media).unwrap().len() > 0);
}

#[tokio::test]
async fn comments_are_collected_and_chrome_filtered() {
    let tmp = TempDir::new().unwrap();
    let primary = StubSession::new()
        .with(
            selectors::CAPTION_BLOCKS,
            vec![text_element("A caption line")],
        )
        .with(
            selectors::ROLE_BUTTONS,
            vec![text_element("Comment")],
        )
        .with(
            selectors::COMMENT_BODIES,
            vec![
                text_element("Ana Author\nLove this place"),
                text_element("Ben Author\nLove this place"),
                text_element("Reply"),
                text_element("Cara Author\nSee you there!"),
            ],
        );
    let sessions = pair(primary, StubSession::new());
    let downloader = StubDownloader::failing();
    let link = text_link();

    let outcome = extract_post(
        &sessions,
        &downloader,
        &link,
        tmp.path(),
        &fast_extractor_config(),
    )
    .await
    .unwrap();

    assert!(outcome.success);
    let comments = std::fs::read_to_string(tmp.path().join("comments.txt")).unwrap();
    let lines: Vec<&str> = comments.lines().collect();
    assert_eq!(lines, vec!["Love this place", "See you there!"]);
}
