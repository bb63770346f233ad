//! Local HTTP fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use bigbook_loader::config::{DEFAULT_CLIENT_ERRORS_PATH, DEFAULT_REGISTRY_PATH};
use bigbook_loader::{Export, LoaderConfig, Module, ModuleTable, RenderContext, RenderError};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn config_for(base_url: &str) -> LoaderConfig {
    LoaderConfig { base_url: base_url.to_string(), ..LoaderConfig::default() }
}

/// Body as the server's registry endpoint returns it.
pub fn registry_body() -> Value {
    json!({
        "success": true,
        "components": {
            "foo": {
                "id": "foo",
                "name": "Foo",
                "path": "src/components/bigbook/custom/Foo.tsx",
                "route": "/bigbook/component/foo",
                "displayName": "Foo",
                "description": "Custom Big Book component: Foo",
                "installedAt": "2025-07-20T10:00:00.000Z",
                "autoInstalled": true,
                "isDefaultExport": true,
                "hasJSX": true,
                "hasHooks": true,
                "dependencies": ["react", "@mui/material"]
            },
            "widget": {
                "id": "widget",
                "name": "Widget",
                "path": "src/components/bigbook/custom/Widget.tsx",
                "displayName": "Widget",
                "isDefaultExport": false
            }
        },
        "routes": { "/bigbook/component/foo": "foo" },
        "menu": [{
            "id": "foo",
            "name": "Foo",
            "displayName": "Foo",
            "route": "/bigbook/component/foo",
            "icon": "Extension"
        }],
        "lastUpdated": "2025-07-20T10:00:00.000Z",
        "version": "1.0.0"
    })
}

pub fn markup(text: &'static str) -> Export {
    Export::component(move |_: &RenderContext| -> Result<String, RenderError> { Ok(format!("<p>{text}</p>")) })
}

/// Modules published for [`registry_body`]: `Foo` has a default export,
/// `Widget` exports nothing under its own name.
pub fn modules() -> ModuleTable {
    let mut table = ModuleTable::new();
    table
        .insert_path("src/components/bigbook/custom/Foo.tsx", Module::new().with_default(markup("foo")))
        .unwrap();
    table
        .insert_path("src/components/bigbook/custom/Widget.tsx", Module::new().with_named("Other", markup("other")))
        .unwrap();
    table
}

/// A fake BigBook server: the registry answers `status` with `body`, and
/// client-error posts are forwarded on the returned channel.
pub struct FakeServer {
    pub base_url: String,
    pub client_errors: mpsc::UnboundedReceiver<Value>,
    pub last_cookie: Arc<Mutex<Option<String>>>,
}

pub async fn fake_server(status: StatusCode, body: String) -> FakeServer {
    let (tx, client_errors) = mpsc::unbounded_channel();
    let last_cookie = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&last_cookie);

    let app = Router::new()
        .route(
            DEFAULT_REGISTRY_PATH,
            get(move |headers: HeaderMap| {
                let seen = Arc::clone(&seen);
                let body = body.clone();
                async move {
                    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()).map(str::to_string);
                    *seen.lock().unwrap() = cookie;
                    (status, [(header::CONTENT_TYPE, "application/json")], body)
                }
            }),
        )
        .route(
            DEFAULT_CLIENT_ERRORS_PATH,
            post(move |axum::Json(report): axum::Json<Value>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(report);
                    axum::Json(json!({ "success": true }))
                }
            }),
        );

    FakeServer { base_url: serve(app).await, client_errors, last_cookie }
}
