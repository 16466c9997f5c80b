use super::{setup_store, upload};
use crate::pagination::PageParams;
use crate::services::content_service::{SheetPayload, SheetRow};
use crate::services::filters::ContentFilters;

fn sheet_row(title: &str, file_name: &str) -> SheetRow {
    SheetRow {
        title: title.into(),
        file_name: file_name.into(),
        description: None,
        copyright: None,
        rights_statement: None,
        published_date: None,
        reviewed_on: None,
        active: None,
        metadata: None,
    }
}

#[tokio::test]
async fn import_creates_then_updates_by_title() {
    let (service, _dir) = setup_store().await;
    upload(&service, "v1.txt", b"version one").await;
    upload(&service, "v2.txt", b"version two").await;

    let result = service
        .import_sheet(SheetPayload {
            rows: vec![sheet_row("Handbook", "v1.txt")],
        })
        .await
        .unwrap();
    assert_eq!((result.created, result.updated), (1, 0));
    assert!(result.failed.is_empty());

    // Same title again re-binds the row to the new file.
    let result = service
        .import_sheet(SheetPayload {
            rows: vec![sheet_row("Handbook", "v2.txt")],
        })
        .await
        .unwrap();
    assert_eq!((result.created, result.updated), (0, 1));

    let page = service
        .list_contents(&ContentFilters::default(), &PageParams::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.data[0].record.file_name, "v2.txt");
}

#[tokio::test]
async fn failing_row_does_not_block_the_rest_of_the_batch() {
    let (service, _dir) = setup_store().await;
    upload(&service, "ok1.txt", b"first fine").await;
    upload(&service, "ok2.txt", b"second fine").await;

    let result = service
        .import_sheet(SheetPayload {
            rows: vec![
                sheet_row("First", "ok1.txt"),
                sheet_row("Broken", "missing.txt"),
                sheet_row("Second", "ok2.txt"),
            ],
        })
        .await
        .unwrap();

    assert_eq!(result.created, 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].row, 1);
    assert_eq!(result.failed[0].title, "Broken");

    let page = service
        .list_contents(&ContentFilters::default(), &PageParams::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 2);
}

#[tokio::test]
async fn metadata_tokens_create_catalog_entries_on_demand() {
    let (service, _dir) = setup_store().await;
    upload(&service, "tagged.txt", b"tagged").await;

    let mut row = sheet_row("Tagged", "tagged.txt");
    row.metadata = Some(vec!["Language:English".into(), "Language:French".into()]);
    let result = service
        .import_sheet(SheetPayload { rows: vec![row] })
        .await
        .unwrap();
    assert_eq!(result.created, 1);

    let entries = service
        .metadata_by_type_name("Language", &PageParams::default())
        .await
        .unwrap();
    assert_eq!(entries.total_count, 2);

    let page = service
        .list_contents(&ContentFilters::default(), &PageParams::default())
        .await
        .unwrap();
    let tags: Vec<_> = page.data[0].metadata.iter().map(|m| m.name.clone()).collect();
    assert_eq!(tags, vec!["English", "French"]);
}

#[tokio::test]
async fn malformed_metadata_token_fails_only_its_row() {
    let (service, _dir) = setup_store().await;
    upload(&service, "good.txt", b"good").await;
    upload(&service, "bad.txt", b"bad").await;

    let mut bad = sheet_row("Bad", "bad.txt");
    bad.metadata = Some(vec!["no-colon-here".into()]);
    let result = service
        .import_sheet(SheetPayload {
            rows: vec![bad, sheet_row("Good", "good.txt")],
        })
        .await
        .unwrap();

    assert_eq!(result.created, 1);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].row, 0);

    // The failed row left nothing behind: per-row atomicity.
    let page = service
        .list_contents(&ContentFilters::default(), &PageParams::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.data[0].record.title, "Good");
}
