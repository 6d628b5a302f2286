//! Showcase backend: phone data API plus static site/model serving.
//!
//! The catalog lives in a `phones.json` file and is re-read per request, so
//! edits show up without a restart. An unreadable or malformed data file
//! degrades to an empty catalog rather than an error response.

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use catalog::Catalog;

#[derive(Clone)]
struct AppState {
    site_root: PathBuf,
    data_path: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let site_root = PathBuf::from(env::var("SHOWCASE_ROOT").unwrap_or_else(|_| ".".to_string()));
    let data_path = env::var("SHOWCASE_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| site_root.join("data").join("phones.json"));
    let addr: SocketAddr = env::var("SHOWCASE_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
        .parse()
        .expect("invalid SHOWCASE_ADDR");

    let state = AppState {
        site_root,
        data_path,
    };

    info!("showcase server listening on http://{addr}");
    axum::serve(
        tokio::net::TcpListener::bind(addr).await.unwrap(),
        app(state),
    )
    .await
    .unwrap();
}

fn app(state: AppState) -> Router {
    let models_dir = ServeDir::new(state.site_root.join("models"));
    let site = ServeDir::new(state.site_root.clone());

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/phones", get(get_phones))
        .route("/api/phones/:id", get(get_phone))
        .route("/api/models", get(get_models))
        .nest_service("/models", models_dir)
        .fallback_service(site)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn get_phones(State(state): State<AppState>) -> Json<Catalog> {
    Json(load_catalog(&state.data_path).await)
}

async fn get_phone(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let catalog = load_catalog(&state.data_path).await;
    match catalog.get(&id) {
        Some(record) => Json(record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "phone record not found"})),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    name: String,
    path: String,
    size: u64,
    last_modified: f64,
}

async fn get_models(State(state): State<AppState>) -> Response {
    match list_models(&state.site_root.join("models")).await {
        Ok(models) => Json(models).into_response(),
        Err(err) => {
            error!("model listing failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "could not list models"})),
            )
                .into_response()
        }
    }
}

async fn load_catalog(path: &Path) -> Catalog {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) => {
            error!("phone data unreadable at {path:?}: {err}");
            return Catalog::new();
        }
    };
    match Catalog::from_json(&raw) {
        Ok(catalog) => catalog,
        Err(err) => {
            error!("phone data malformed at {path:?}: {err}");
            Catalog::new()
        }
    }
}

async fn list_models(dir: &Path) -> std::io::Result<Vec<ModelEntry>> {
    let mut out = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        out.push(ModelEntry {
            path: format!("models/{name}"),
            name,
            size: metadata.len(),
            last_modified,
        });
    }
    // Directory iteration order is platform-dependent; keep listings stable.
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const PHONES_JSON: &str = r#"{
        "phone1": {
            "name": "Nova X",
            "modelPath": "models/nova_x.glb",
            "scale": 1.0,
            "position": {"x": 0.0, "y": -1.0, "z": 0.0},
            "rotation": {"x": 0.0, "y": 0.0, "z": 0.0},
            "specs": {"screenSize": "6.1\"", "processor": "Octa-core",
                      "camera": "48 MP", "battery": "4200 mAh", "storage": "128 GB"}
        },
        "phone2": {
            "name": "Nova Lite",
            "modelPath": "models/nova_lite.glb",
            "specs": {"screenSize": "5.8\"", "processor": "Hexa-core",
                      "camera": "12 MP", "battery": "3600 mAh", "storage": "64 GB"}
        }
    }"#;

    fn test_state() -> (tempfile::TempDir, AppState) {
        let root = tempfile::tempdir().unwrap();
        let data_dir = root.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let data_path = data_dir.join("phones.json");
        std::fs::write(&data_path, PHONES_JSON).unwrap();
        std::fs::create_dir_all(root.path().join("models")).unwrap();
        std::fs::write(root.path().join("models").join("nova_x.glb"), b"glTF").unwrap();

        let state = AppState {
            site_root: root.path().to_path_buf(),
            data_path,
        };
        (root, state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_data_file_degrades_to_empty_catalog() {
        let catalog = load_catalog(Path::new("/definitely/not/here.json")).await;
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn catalog_endpoint_serves_records_in_order() {
        let (_root, state) = test_state();
        let response = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/phones")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["phone1", "phone2"]);
        assert_eq!(json["phone1"]["name"], "Nova X");
        assert_eq!(json["phone2"]["scale"], 1.0);
    }

    #[tokio::test]
    async fn single_record_lookup() {
        let (_root, state) = test_state();
        let response = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/phones/phone2")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["modelPath"], "models/nova_lite.glb");
        assert_eq!(json["specs"]["battery"], "3600 mAh");
    }

    #[tokio::test]
    async fn unknown_phone_is_a_404() {
        let (_root, state) = test_state();
        let response = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/phones/phone99")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn model_listing_names_files() {
        let (_root, state) = test_state();
        let response = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/models")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["name"], "nova_x.glb");
        assert_eq!(list[0]["path"], "models/nova_x.glb");
        assert!(list[0]["size"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (_root, state) = test_state();
        let response = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/healthz")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
