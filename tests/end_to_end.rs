mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use bigbook_loader::observe::MemorySink;
use bigbook_loader::{BoundaryView, ComponentLoader, ErrorKind, FaultBoundary, LoadState, RenderContext};

use common::{config_for, fake_server, modules, registry_body};

async fn load(loader: &ComponentLoader, identifier: &str) -> LoadState {
    let token = loader.request_load(identifier);
    loader.settled(token).await
}

#[tokio::test]
async fn default_export_loads_and_renders() {
    let server = fake_server(StatusCode::OK, registry_body().to_string()).await;
    let loader = ComponentLoader::from_config(&config_for(&server.base_url), Arc::new(modules())).unwrap();

    let state = load(&loader, "foo").await;
    let module = state.module().expect("ready");
    assert_eq!(module.reference.as_str(), "components/bigbook/custom/Foo");

    let sink = MemorySink::new();
    let mut boundary = FaultBoundary::new("foo", Arc::new(sink.clone()));
    let view = boundary.render_module(module, &RenderContext::new("foo"));
    assert_eq!(view, BoundaryView::Content("<p>foo</p>".into()));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn registry_outage_fails_and_is_forwarded() {
    let body = serde_json::json!({ "success": false, "error": "boom" }).to_string();
    let mut server = fake_server(StatusCode::INTERNAL_SERVER_ERROR, body).await;
    let loader = ComponentLoader::from_config(&config_for(&server.base_url), Arc::new(modules())).unwrap();

    let state = load(&loader, "foo").await;
    let error = state.error().expect("failed");
    assert_eq!(error.kind(), ErrorKind::RegistryUnavailable);
    assert!(error.to_string().starts_with("fetch"));
    assert!(error.to_string().contains("'foo'"));

    let report = tokio::time::timeout(Duration::from_secs(5), server.client_errors.recv())
        .await
        .expect("client error posted")
        .expect("channel open");
    assert_eq!(report["error"]["name"], "RegistryUnavailable");
    assert_eq!(report["metadata"]["identifier"], "foo");
    assert!(report["metadata"]["errorId"].as_str().unwrap().starts_with("ERR_"));
}

#[tokio::test]
async fn unknown_identifier_is_not_found() {
    let server = fake_server(StatusCode::OK, registry_body().to_string()).await;
    let loader = ComponentLoader::from_config(&config_for(&server.base_url), Arc::new(modules())).unwrap();

    let state = load(&loader, "bar").await;
    let error = state.error().expect("failed");
    assert_eq!(error.kind(), ErrorKind::ComponentNotFound);
    assert!(error.to_string().contains("bar"));
}

#[tokio::test]
async fn missing_named_export_is_export_not_found() {
    let server = fake_server(StatusCode::OK, registry_body().to_string()).await;
    let loader = ComponentLoader::from_config(&config_for(&server.base_url), Arc::new(modules())).unwrap();

    let state = load(&loader, "widget").await;
    let error = state.error().expect("failed");
    assert_eq!(error.kind(), ErrorKind::ExportNotFound);
    assert!(error.to_string().contains("Widget"));
}
