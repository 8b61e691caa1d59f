use std::fs;

use tempfile::tempdir;

use notion_syndicate::contract::{MockPublisher, PublishError};
use notion_syndicate::syndicate::{batch_send_posts, PostAction, SyndicateError};

const PAGE_ID: &str = "abcd1234abcd1234abcd1234";
const CANONICAL_ID: &str = "abcd1234-abcd-1234-abcd1234";

fn write_cleaned_page(dir: &std::path::Path) {
    fs::write(
        dir.join(format!("My Page {PAGE_ID}.md")),
        "# My Page\n\nbody text\n",
    )
    .unwrap();
}

#[tokio::test]
async fn unmapped_page_creates_exactly_one_post_and_persists_the_table() {
    let cleaned = tempdir().unwrap();
    write_cleaned_page(cleaned.path());
    let mapping = cleaned.path().join("mapping.csv");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_post()
        .times(1)
        .withf(|message: &str| {
            message.starts_with("# My Page") && message.ends_with(CANONICAL_ID)
        })
        .returning(|_| Ok("111_222".to_string()));
    publisher.expect_update_post().times(0);

    let reports = batch_send_posts(cleaned.path(), &mapping, &publisher, true)
        .await
        .expect("reconciliation should succeed");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].action, PostAction::Created);
    assert_eq!(reports[0].notion_id, CANONICAL_ID);
    assert_eq!(reports[0].fb_id, "111_222");

    let table = fs::read_to_string(&mapping).unwrap();
    assert!(table.starts_with("notion_id,fb_id"));
    assert!(table.contains(&format!("{CANONICAL_ID},111_222")));
}

#[tokio::test]
async fn mapped_page_updates_in_place_without_rewriting_the_table() {
    let cleaned = tempdir().unwrap();
    write_cleaned_page(cleaned.path());
    let mapping = cleaned.path().join("mapping.csv");
    fs::write(&mapping, format!("notion_id,fb_id\n{CANONICAL_ID},111_222\n")).unwrap();

    let mut publisher = MockPublisher::new();
    publisher
        .expect_update_post()
        .times(1)
        .withf(|post_id: &str, _message: &str| post_id == "111_222")
        .returning(|_, _| Ok(()));
    publisher.expect_create_post().times(0);

    let reports = batch_send_posts(cleaned.path(), &mapping, &publisher, true)
        .await
        .expect("reconciliation should succeed");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].action, PostAction::Updated);

    // A successful update leaves the committed table untouched.
    let table = fs::read_to_string(&mapping).unwrap();
    assert_eq!(table, format!("notion_id,fb_id\n{CANONICAL_ID},111_222\n"));
}

#[tokio::test]
async fn authentication_failure_on_update_falls_back_to_create_and_remaps() {
    let cleaned = tempdir().unwrap();
    write_cleaned_page(cleaned.path());
    let mapping = cleaned.path().join("mapping.csv");
    fs::write(&mapping, format!("notion_id,fb_id\n{CANONICAL_ID},111_222\n")).unwrap();

    let mut publisher = MockPublisher::new();
    publisher.expect_update_post().times(1).returning(|_, _| {
        Err(PublishError::Authentication {
            kind: "GraphMethodException".to_string(),
            code: "100".to_string(),
        })
    });
    publisher
        .expect_create_post()
        .times(1)
        .returning(|_| Ok("111_999".to_string()));

    let reports = batch_send_posts(cleaned.path(), &mapping, &publisher, true)
        .await
        .expect("fallback create should succeed");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].action, PostAction::Remapped);
    assert_eq!(reports[0].fb_id, "111_999");

    let table = fs::read_to_string(&mapping).unwrap();
    assert!(table.contains(&format!("{CANONICAL_ID},111_999")));
    assert!(!table.contains("111_222"));
}

#[tokio::test]
async fn non_authentication_update_failure_is_fatal() {
    let cleaned = tempdir().unwrap();
    write_cleaned_page(cleaned.path());
    let mapping = cleaned.path().join("mapping.csv");
    fs::write(&mapping, format!("notion_id,fb_id\n{CANONICAL_ID},111_222\n")).unwrap();

    let mut publisher = MockPublisher::new();
    publisher
        .expect_update_post()
        .times(1)
        .returning(|_, _| Err(PublishError::Api("update reported failure".to_string())));
    publisher.expect_create_post().times(0);

    let err = batch_send_posts(cleaned.path(), &mapping, &publisher, true)
        .await
        .expect_err("non-authentication failures must propagate");
    assert!(matches!(err, SyndicateError::Publish(PublishError::Api(_))));
}

#[tokio::test]
async fn notion_id_is_only_appended_when_configured() {
    let cleaned = tempdir().unwrap();
    write_cleaned_page(cleaned.path());
    let mapping = cleaned.path().join("mapping.csv");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_post()
        .times(1)
        .withf(|message: &str| !message.contains(CANONICAL_ID))
        .returning(|_| Ok("111_222".to_string()));

    batch_send_posts(cleaned.path(), &mapping, &publisher, false)
        .await
        .expect("reconciliation should succeed");
}
