use notion_syndicate::contract::{ExportError, ExportStatus, MockExporter};
use notion_syndicate::export::{export_filename, wait_for_export, NotionExporter};

#[test]
fn filename_comes_from_the_content_disposition_parameter() {
    let link = "https://s3.example.com/export.zip?\
                response-content-disposition=attachment%3B%20filename%3D%22Export-d75dcb9e.zip%22\
                &other=1";
    assert_eq!(export_filename(link), "Export-d75dcb9e.zip");
}

#[test]
fn missing_disposition_falls_back_to_a_timestamped_name() {
    let name = export_filename("https://s3.example.com/export.zip");
    assert!(name.starts_with("Export-no-name-"));
    assert!(name.ends_with(".zip"));
}

#[test]
fn unquoted_disposition_also_falls_back() {
    let link = "https://s3.example.com/export.zip?response-content-disposition=inline";
    let name = export_filename(link);
    assert!(name.starts_with("Export-no-name-"));
}

#[test]
fn export_is_complete_once_a_download_link_appears() {
    let pending = ExportStatus {
        state: Some("in_progress".to_string()),
        export_url: None,
    };
    assert!(!pending.is_complete());

    let done = ExportStatus {
        state: Some("success".to_string()),
        export_url: Some("https://s3.example.com/export.zip".to_string()),
    };
    assert!(done.is_complete());
}

#[tokio::test]
async fn polling_gives_up_after_the_last_attempt() {
    let mut exporter = MockExporter::new();
    exporter.expect_export_status().times(2).returning(|_| {
        Ok(ExportStatus {
            state: Some("in_progress".to_string()),
            export_url: None,
        })
    });

    let err = wait_for_export(&exporter, "task-1", 0, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::TimedOut(2)));
}

#[tokio::test]
async fn unreachable_api_base_fails_the_token_check() {
    let exporter =
        NotionExporter::with_api_base("tok".to_string(), "http://127.0.0.1:1".to_string());
    assert!(!exporter.can_connect().await);
}
