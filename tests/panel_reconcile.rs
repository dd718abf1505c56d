mod common;

use common::*;
use docpanel_lib::documents::{ActionKind, ActionResult, RefreshResult};
use docpanel_lib::{ClientError, DocumentPanel, FormParams, PanelRegistry, UiEvent, UploadTask};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn panel(
    server: &MockServer,
    accept_prompts: bool,
    rows: &[&str],
) -> (DocumentPanel, UnboundedReceiver<UiEvent>) {
    let (sink, rx) = sink(accept_prompts);
    let panel = DocumentPanel::new(PREFIX, client(server, 1024), sink, form())
        .unwrap()
        .with_rows(rows.iter().map(|id| (*id, format!("<tr>{}</tr>", id))));
    (panel, rx)
}

async fn mount_post(server: &MockServer, needle: &str, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/cgi/users/home"))
        .and(body_string_contains(needle))
        .respond_with(template)
        .mount(server)
        .await;
}

fn swapped(events: &[UiEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::RowsSwapped { left, right, .. } => Some((left.clone(), right.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn reorder_uses_adjacent_swaps_only() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "_internal_docs_up=1",
        ResponseTemplate::new(200).set_body_json(json!({
            "documents": [{"id": 3}, {"id": 1}, {"id": 2}],
        })),
    )
    .await;

    let (mut panel, mut rx) = panel(&server, true, &["1", "2", "3"]);
    let result = panel
        .run_action("3", "_internal_docs_up", ActionKind::Automatic)
        .await
        .unwrap();

    let ActionResult::Reconciled(report) = result else {
        panic!("expected a reconciled document set");
    };
    assert!(report.removed.is_empty());
    assert!(report.fetched.is_empty());
    assert_eq!(report.swaps.len(), 2);
    assert_eq!(panel.document_ids(), vec!["3", "1", "2"]);
    // Rows keep their content when moved
    assert_eq!(panel.list().get("3").unwrap().html, "<tr>3</tr>");

    let events = drain(&mut rx);
    assert_eq!(
        swapped(&events),
        vec![
            ("2".to_string(), "3".to_string()),
            ("1".to_string(), "3".to_string()),
        ]
    );
    assert_eq!(requests_with(&server, "POST", "docs_update_doc=3").await, 1);
    assert_eq!(requests_with(&server, "POST", "docs_export=3").await, 1);
}

#[tokio::test]
async fn omitted_document_is_removed() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "_internal_docs_delete=1",
        ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 3}])),
    )
    .await;

    let (mut panel, mut rx) = panel(&server, true, &["1", "2", "3"]);
    let result = panel
        .run_action("2", "_internal_docs_delete", ActionKind::Automatic)
        .await
        .unwrap();

    let ActionResult::Reconciled(report) = result else {
        panic!("expected a reconciled document set");
    };
    assert_eq!(report.removed, vec!["2"]);
    assert!(report.swaps.is_empty());
    assert_eq!(panel.document_ids(), vec!["1", "3"]);
    assert!(drain(&mut rx).contains(&UiEvent::RowRemoved {
        panel: PREFIX.to_string(),
        document_id: "2".to_string(),
    }));
}

#[tokio::test]
async fn new_and_dirty_rows_are_fetched() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "_internal_docs_convert=1",
        ResponseTemplate::new(200).set_body_json(json!({
            "documents": [{"id": 1}, {"id": 2, "refresh": true}, {"id": 4}],
            "messages": ["<div>Converted</div>"],
        })),
    )
    .await;
    mount_post(
        &server,
        "docs_export=2",
        ResponseTemplate::new(200).set_body_string("<tr>2 v2</tr>"),
    )
    .await;
    mount_post(
        &server,
        "docs_export=4",
        ResponseTemplate::new(200).set_body_string("<tr>4</tr>"),
    )
    .await;

    let (mut panel, mut rx) = panel(&server, true, &["1", "2"]);
    let result = panel
        .run_action("1", "_internal_docs_convert", ActionKind::Automatic)
        .await
        .unwrap();

    let ActionResult::Reconciled(report) = result else {
        panic!("expected a reconciled document set");
    };
    assert_eq!(report.fetched, vec!["2", "4"]);
    assert_eq!(panel.document_ids(), vec!["1", "2", "4"]);
    assert_eq!(panel.list().get("1").unwrap().html, "<tr>1</tr>");
    assert_eq!(panel.list().get("2").unwrap().html, "<tr>2 v2</tr>");

    let events = drain(&mut rx);
    assert!(events.contains(&UiEvent::Messages {
        panel: PREFIX.to_string(),
        messages: vec!["<div>Converted</div>".to_string()],
    }));
    assert!(events.iter().any(
        |e| matches!(e, UiEvent::RowReplaced { document_id, .. } if document_id == "2")
    ));
    assert!(events.iter().any(
        |e| matches!(e, UiEvent::RowInserted { document_id, .. } if document_id == "4")
    ));
    // Refreshes never carry the update marker
    assert_eq!(requests_with(&server, "POST", "docs_update_doc").await, 1);
}

#[tokio::test]
async fn refresh_of_missing_document_removes_row() {
    let server = MockServer::start().await;
    mount_post(&server, "docs_export=2", ResponseTemplate::new(404)).await;

    let (mut panel, mut rx) = panel(&server, true, &["1", "2"]);
    let result = panel.refresh_document("2").await.unwrap();

    assert_eq!(result, RefreshResult::Removed);
    assert_eq!(panel.document_ids(), vec!["1"]);
    let events = drain(&mut rx);
    assert!(alerts(&events).is_empty());
    assert!(events
        .iter()
        .any(|e| matches!(e, UiEvent::RowRemoved { document_id, .. } if document_id == "2")));
}

#[tokio::test]
async fn non_json_action_response_alerts_and_keeps_rows() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "_internal_docs_up=1",
        ResponseTemplate::new(200).set_body_string("<html>Session expired</html>"),
    )
    .await;

    let (mut panel, mut rx) = panel(&server, true, &["1", "2"]);
    let err = panel
        .run_action("2", "_internal_docs_up", ActionKind::Automatic)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Malformed { .. }));
    assert_eq!(panel.document_ids(), vec!["1", "2"]);
    let alerts = alerts(&drain(&mut rx));
    assert_eq!(
        alerts,
        vec!["Expected JSON but got: <html>Session expired</html>".to_string()]
    );
}

#[tokio::test]
async fn failed_fetch_reports_length_mismatch() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "_internal_docs_up=1",
        ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 5}])),
    )
    .await;
    mount_post(&server, "docs_export=5", ResponseTemplate::new(500)).await;

    let (mut panel, mut rx) = panel(&server, true, &["1"]);
    let err = panel
        .run_action("1", "_internal_docs_up", ActionKind::Automatic)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::ListMismatch {
            local: 1,
            server: 2
        }
    ));
    let alerts = alerts(&drain(&mut rx));
    assert_eq!(alerts.len(), 2);
    assert!(alerts[1].contains("length mismatch"));
}

#[tokio::test]
async fn interactive_action_returns_dialog_then_reconciles_on_submit() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "_internal_docs_convert=1",
        ResponseTemplate::new(200).set_body_string("<form><input name=\"_action_convert\"/></form>"),
    )
    .await;
    mount_post(
        &server,
        "_action_convert=1",
        ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])),
    )
    .await;
    mount_post(
        &server,
        "docs_export=2",
        ResponseTemplate::new(200).set_body_string("<tr>2</tr>"),
    )
    .await;

    let (mut panel, _rx) = panel(&server, true, &["1"]);
    let result = panel
        .run_action("1", "_internal_docs_convert", ActionKind::Interactive)
        .await
        .unwrap();
    let ActionResult::Dialog(html) = result else {
        panic!("expected a dialog");
    };
    assert!(html.contains("_action_convert"));
    assert_eq!(panel.document_ids(), vec!["1"]);

    let dialog: FormParams = [("screen", "EPrint::Document::Convert"), ("documentid", "1")]
        .into_iter()
        .collect();
    let report = panel.submit_dialog(dialog, "_action_convert").await.unwrap();

    assert_eq!(report.fetched, vec!["2"]);
    assert_eq!(panel.document_ids(), vec!["1", "2"]);
    assert_eq!(requests_with(&server, "POST", "_action_convert=1&export=1").await, 1);
}

#[tokio::test]
async fn declined_large_batch_starts_nothing() {
    let server = MockServer::start().await;
    let (mut panel, mut rx) = panel(&server, false, &[]);
    let tasks = (0..6)
        .map(|i| UploadTask::from_bytes(format!("f{}.txt", i), "text/plain", vec![0u8; 4]))
        .collect();

    let report = panel.upload_files(tasks).await;

    assert!(report.declined);
    assert!(report.completed.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(drain(&mut rx).is_empty());
    assert!(panel.uploads().active_ids().await.is_empty());
}

#[tokio::test]
async fn failing_sibling_does_not_affect_other_upload() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "filename=good.txt",
        ResponseTemplate::new(200).set_body_json(json!({"documentId": 5, "fileId": 9})),
    )
    .await;
    mount_post(&server, "filename=bad.txt", ResponseTemplate::new(500)).await;
    mount_post(&server, "_internal_docs_upload_done=1", ResponseTemplate::new(200)).await;
    mount_post(
        &server,
        "docs_export=5",
        ResponseTemplate::new(200).set_body_string("<tr>5</tr>"),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/id/file/9"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (mut panel, mut rx) = panel(&server, true, &[]);
    let good = UploadTask::from_bytes("good.txt", "text/plain", vec![1u8; 3000]);
    let bad = UploadTask::from_bytes("bad.txt", "text/plain", vec![2u8; 3000]);
    let bad_id = bad.id().to_string();

    let report = panel.upload_files(vec![good, bad]).await;

    assert!(!report.declined);
    assert_eq!(report.completed, vec!["5"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, bad_id);
    assert_eq!(panel.document_ids(), vec!["5"]);
    assert_eq!(content_ranges(&server).await.len(), 3);
    assert!(panel.uploads().active_ids().await.is_empty());

    let events = drain(&mut rx);
    assert_eq!(alerts(&events).len(), 1);
    let queued = events
        .iter()
        .filter(|e| matches!(e, UiEvent::UploadQueued { .. }))
        .count();
    assert_eq!(queued, 2);
}

#[tokio::test]
async fn cancel_of_unknown_upload_is_false() {
    let server = MockServer::start().await;
    let (panel, _rx) = panel(&server, true, &[]);
    assert!(!panel.cancel_upload("nope").await);
}

#[tokio::test]
async fn lists_files_of_a_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/id/document/7"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"fileid": 1, "filename": "a.pdf", "filesize": 10}],
        })))
        .mount(&server)
        .await;

    let (panel, _rx) = panel(&server, true, &["7"]);
    let files = panel.list_remote_files("7").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "a.pdf");
    assert_eq!(files[0].size, 10);
}

#[tokio::test]
async fn refresh_everywhere_targets_panels_showing_the_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("_export=5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<tr>5</tr>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("_export=8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<tr>8</tr>"))
        .mount(&server)
        .await;

    let (docs, _rx) = panel(&server, true, &["5"]);
    let (sink, _extra_rx) = sink(true);
    let extra = DocumentPanel::new("extra", client(&server, 1024), sink, form()).unwrap();

    let mut registry = PanelRegistry::new();
    registry.register(docs);
    registry.register(extra);
    assert_eq!(registry.prefixes(), vec!["docs", "extra"]);

    let shown = registry.refresh_everywhere("5").await;
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].0, "docs");
    assert_eq!(*shown[0].1.as_ref().unwrap(), RefreshResult::Replaced);

    let fresh = registry.refresh_everywhere("8").await;
    let prefixes: Vec<&str> = fresh.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(prefixes, vec!["docs", "extra"]);
    assert!(fresh
        .iter()
        .all(|(_, r)| matches!(r, Ok(RefreshResult::Inserted))));

    let extra = registry.deregister("extra").unwrap();
    assert_eq!(extra.lock().await.document_ids(), vec!["8"]);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn running_batch_can_be_cancelled_through_the_shared_panel() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "_internal_docs_create_file=1",
        ResponseTemplate::new(200).set_body_json(json!({"documentId": 5, "fileId": 9})),
    )
    .await;
    mount_post(&server, "_internal_docs_upload_done=1", ResponseTemplate::new(200)).await;
    Mock::given(method("PUT"))
        .and(path("/id/file/9"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/id/file/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (panel, mut rx) = panel(&server, true, &[]);
    let mut registry = PanelRegistry::new();
    let shared = registry.register(panel);

    let task = UploadTask::from_bytes("big.bin", "application/octet-stream", vec![0u8; 4096]);
    let task_id = task.id().to_string();
    let batch = tokio::spawn({
        let shared = shared.clone();
        async move { DocumentPanel::upload_shared(&shared, vec![task]).await }
    });

    for _ in 0..100 {
        if !content_ranges(&server).await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    // The batch does not hold the panel while chunks are in flight
    let cancelled = tokio::time::timeout(
        Duration::from_millis(150),
        async { shared.lock().await.cancel_upload(&task_id).await },
    )
    .await
    .unwrap();
    assert!(cancelled);

    let report = batch.await.unwrap();
    assert_eq!(report.cancelled, vec![task_id.clone()]);
    assert!(report.completed.is_empty());
    assert_eq!(content_ranges(&server).await, vec!["0-1023/4096"]);
    assert_eq!(requests_with(&server, "POST", "upload_done").await, 0);
    assert!(shared.lock().await.document_ids().is_empty());
    assert!(!registry.cancel_upload(&task_id).await);
    assert!(drain(&mut rx).contains(&UiEvent::ProgressHidden { task_id }));
}

#[tokio::test]
async fn registry_cancels_upload_in_the_panel_that_started_it() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "_internal_docs_create_file=1",
        ResponseTemplate::new(200).set_body_json(json!({"documentId": 5, "fileId": 9})),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/id/file/9"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/id/file/9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (docs, _rx) = panel(&server, true, &[]);
    let (sink, _extra_rx) = sink(true);
    let extra = DocumentPanel::new("extra", client(&server, 1024), sink, form()).unwrap();
    let mut registry = PanelRegistry::new();
    registry.register(extra);
    let shared = registry.register(docs);

    let task = UploadTask::from_bytes("big.bin", "application/octet-stream", vec![0u8; 4096]);
    let task_id = task.id().to_string();
    let batch = shared
        .lock()
        .await
        .begin_uploads(vec![task])
        .await
        .unwrap();
    assert_eq!(batch.task_ids(), vec![task_id.clone()]);
    let running = tokio::spawn(batch.run());

    for _ in 0..100 {
        if !content_ranges(&server).await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(registry.cancel_upload(&task_id).await);

    let report = running.await.unwrap();
    assert_eq!(report.cancelled, vec![task_id]);
    assert_eq!(content_ranges(&server).await.len(), 1);
}
