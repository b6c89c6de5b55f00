// Integration tests for open, query and the refused operations

mod common;

use bundlegate_core::logging_facility::test_capture::init_test_capture;
use bundlegate_core::{BundleId, ContentUri, ContentValues, GwErrorKind, InsertRequest};
use bundlegate_core_types::RequestContext;
use bundlegate_engine::Selection;
use common::{Call, Fixture, TEST_AUTHORITY};
use std::io::Read;

fn insert_payload(fx: &Fixture, name: &str, bytes: &[u8]) -> ContentUri {
    let payload = fx.write_file(name, bytes);
    fx.gateway
        .insert(&InsertRequest {
            payload_path: Some(payload),
            ..InsertRequest::default()
        })
        .unwrap()
}

#[test]
fn test_open_returns_payload_and_leaves_no_staging_file() {
    // Given: A stored bundle
    let fx = Fixture::new();
    let uri = insert_payload(&fx, "photo.jpg", b"\xFF\xD8 jpeg bytes");

    // When: It is opened read-only
    let mut handle = fx.gateway.open(&uri, "r").unwrap();

    // Then: The staging entry is already gone while the handle still reads
    assert!(fx.staging_entries().is_empty(), "{:?}", fx.staging_entries());
    let mut bytes = Vec::new();
    handle.read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes, b"\xFF\xD8 jpeg bytes");
    assert_eq!(handle.len(), bytes.len() as u64);
}

#[cfg(unix)]
#[test]
fn test_open_handle_is_unlinked_file_on_unix() {
    let fx = Fixture::new();
    let uri = insert_payload(&fx, "a.bin", b"abc");

    let handle = fx.gateway.open(&uri, "r").unwrap();

    assert!(handle.is_file_backed());
    assert!(fx.staging_entries().is_empty());
}

#[test]
fn test_open_write_modes_denied_before_extraction() {
    let fx = Fixture::new();
    let uri = ContentUri::for_bundle(TEST_AUTHORITY, &BundleId::from_bytes([1; 32]));

    for mode in ["w", "rw", "wa", "rwt", "a"] {
        let err = fx.gateway.open(&uri, mode).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::PermissionDenied, "mode {}", mode);
    }
    assert!(fx.store.calls().is_empty());
    assert!(!fx.gateway.staging().root().exists());
}

#[test]
fn test_open_bad_id_is_not_found_and_leaves_nothing() {
    let fx = Fixture::new();

    for path in ["/", "/not-hex", "/ABCDEF"] {
        let uri = ContentUri::new(TEST_AUTHORITY, path);
        let err = fx.gateway.open(&uri, "r").unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::NotFound, "path {}", path);
    }
    assert!(fx.store.calls().is_empty());
    assert!(fx.staging_entries().is_empty());
}

#[test]
fn test_open_unknown_bundle_is_not_found_and_cleans_up() {
    let fx = Fixture::new();
    let id = BundleId::from_bytes([0x42; 32]);
    let uri = ContentUri::for_bundle(TEST_AUTHORITY, &id);

    let err = fx.gateway.open(&uri, "r").unwrap_err();

    assert_eq!(err.kind(), GwErrorKind::NotFound);
    assert_eq!(err.bundle_id(), Some(id.to_hex().as_str()));
    assert!(matches!(fx.store.calls().as_slice(), [Call::ExtractPayload(seen)] if *seen == id));
    assert!(fx.staging_entries().is_empty());
}

#[test]
fn test_query_lists_bundles_with_forwarded_args() {
    let fx = Fixture::new();
    insert_payload(&fx, "one.txt", b"1");
    insert_payload(&fx, "two.txt", b"22");

    let table = fx
        .gateway
        .query(&ContentUri::root(TEST_AUTHORITY), &Selection::args(["file", "two.txt"]))
        .unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0, "name"), Some("two.txt"));
    assert!(matches!(
        fx.store.calls().last(),
        Some(Call::List(args)) if args == &vec!["file".to_string(), "two.txt".to_string()]
    ));
}

#[test]
fn test_query_ignores_sort_order() {
    let fx = Fixture::new();
    insert_payload(&fx, "one.txt", b"1");

    let selection = Selection {
        sort_order: Some("name DESC".to_string()),
        ..Selection::default()
    };
    let table = fx
        .gateway
        .query(&ContentUri::root(TEST_AUTHORITY), &selection)
        .unwrap();
    assert_eq!(table.len(), 1);
}

#[test]
fn test_query_rejects_projection_selection_and_paths() {
    let fx = Fixture::new();
    let root = ContentUri::root(TEST_AUTHORITY);

    let cases = [
        (
            root.clone(),
            Selection {
                projection: Some(vec!["name".to_string()]),
                ..Selection::default()
            },
        ),
        (
            root.clone(),
            Selection {
                selection: Some("name = ?".to_string()),
                ..Selection::default()
            },
        ),
        (
            ContentUri::for_bundle(TEST_AUTHORITY, &BundleId::from_bytes([3; 32])),
            Selection::default(),
        ),
    ];
    for (uri, selection) in cases {
        let err = fx.gateway.query(&uri, &selection).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::UnsupportedOperation);
    }
    assert!(fx.store.calls().is_empty());
}

#[test]
fn test_query_listing_failure_is_invalid_input() {
    let fx = Fixture::with(|s| s.failing_list("bad filter"), None);

    let err = fx
        .gateway
        .query(&ContentUri::root(TEST_AUTHORITY), &Selection::args(["x"]))
        .unwrap_err();

    assert_eq!(err.kind(), GwErrorKind::InvalidInput);
    assert_eq!(err.message(), "bad filter");
    assert_eq!(err.root_cause().kind(), GwErrorKind::ExternalService);
}

#[test]
fn test_delete_update_get_type_unsupported_without_side_effects() {
    let fx = Fixture::new();
    let uri = insert_payload(&fx, "keep.txt", b"keep");
    let calls_before = fx.store.calls().len();

    let err = fx.gateway.delete(&uri, &Selection::default()).unwrap_err();
    assert_eq!(err.kind(), GwErrorKind::UnsupportedOperation);
    assert_eq!(err.message(), "Not implemented");

    let err = fx
        .gateway
        .update(&uri, &ContentValues::new(), &Selection::default())
        .unwrap_err();
    assert_eq!(err.kind(), GwErrorKind::UnsupportedOperation);

    let err = fx.gateway.get_type(&uri).unwrap_err();
    assert_eq!(err.kind(), GwErrorKind::UnsupportedOperation);

    assert_eq!(fx.store.calls().len(), calls_before);
    let mut handle = fx.gateway.open(&uri, "r").unwrap();
    let mut text = String::new();
    handle.read_to_string(&mut text).unwrap();
    assert_eq!(text, "keep");
}

#[test]
fn test_each_operation_logs_start_and_one_terminal_event() {
    let capture = init_test_capture();
    let fx = Fixture::new();
    let payload = fx.write_file("log.txt", b"log");

    // Successful insert
    let ok_ctx = RequestContext::new();
    let uri = fx
        .gateway
        .insert_with_context(
            &ok_ctx,
            &InsertRequest {
                payload_path: Some(payload),
                ..InsertRequest::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(
        capture.lifecycle("insert", ok_ctx.request_id.as_str()),
        vec!["start", "end"]
    );

    // Failed open
    let err_ctx = RequestContext::new();
    let err = fx
        .gateway
        .open_with_context(&err_ctx, &uri, "w")
        .unwrap_err();
    assert_eq!(err.request_id(), Some(&err_ctx.request_id));
    assert_eq!(
        capture.lifecycle("open", err_ctx.request_id.as_str()),
        vec!["start", "end_error"]
    );
    let events = capture.events_for_request("open", err_ctx.request_id.as_str());
    assert_eq!(events[1].field("err.code"), Some("ERR_PERMISSION_DENIED"));
}
