use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

use buscador::dataset::load_articles;
use buscador::search::{Mode, SearchIndex};
use buscador::server::{router, AppState};

fn write_dataset(path: &Path, data: &Value) -> Result<()> {
    fs::write(path, data.to_string())?;
    Ok(())
}

fn app(path: &Path) -> Result<Router> {
    let index = SearchIndex::new(load_articles(path)?);
    Ok(router(AppState::new(index, path, Mode::Both)))
}

async fn send(app: &Router, method: Method, uri: &str) -> Result<(StatusCode, String)> {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, String::from_utf8(bytes.to_vec())?))
}

fn sample() -> Value {
    json!([
        {
            "tema": "Redes Neuronales",
            "palabras_clave": ["aprendizaje profundo", "IA"],
            "contenido": "Las <redes> neuronales imitan al cerebro.",
            "origen": "Revista"
        },
        {
            "tema": "Bases de Datos",
            "palabras_clave": ["SQL", "redes de datos"],
            "contenido": "Modelos relacionales.",
            "origen": "Libro"
        }
    ])
}

#[tokio::test]
async fn test_api_search_returns_ranked_json() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("data.json");
    write_dataset(&path, &sample())?;
    let app = app(&path)?;

    let (status, body) = send(&app, Method::GET, "/api/search?q=redes&mode=ambos").await?;
    assert_eq!(status, StatusCode::OK);

    let response: Value = serde_json::from_str(&body)?;
    assert_eq!(response["total"], 2);
    assert_eq!(response["mode"], "ambos");
    assert_eq!(response["results"][0]["tema"], "Redes Neuronales");
    assert_eq!(response["results"][0]["score"], 44);
    assert_eq!(response["results"][1]["origen"], "palabras_clave");
    assert_eq!(response["results"][1]["coincidencia"], "redes de datos");

    Ok(())
}

#[tokio::test]
async fn test_unknown_mode_is_bad_request() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("data.json");
    write_dataset(&path, &sample())?;
    let app = app(&path)?;

    let (status, body) = send(&app, Method::GET, "/api/search?q=redes&mode=todo").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("todo"));

    Ok(())
}

#[tokio::test]
async fn test_results_fragment_highlights_and_escapes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("data.json");
    write_dataset(&path, &sample())?;
    let app = app(&path)?;

    let (status, html) = send(&app, Method::GET, "/results?q=redes&mode=tema").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("1 resultados"));
    assert!(html.contains("Redes Neuronales • tema"));
    assert!(html.contains("&lt;<mark>redes</mark>&gt;"));

    let (_, html) = send(&app, Method::GET, "/results?q=zzzz").await?;
    assert!(html.contains("Sin resultados"));
    assert!(html.contains("0 resultados"));

    // An empty submission still searches; only a missing query is idle
    let (_, html) = send(&app, Method::GET, "/results?q=&mode=ambos").await?;
    assert!(html.contains("Sin resultados"));
    assert!(html.contains("0 resultados"));

    let (_, html) = send(&app, Method::GET, "/results?mode=ambos").await?;
    assert!(html.contains("Escribe para buscar"));
    assert!(!html.contains("Sin resultados"));

    Ok(())
}

#[tokio::test]
async fn test_index_page_renders_form() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("data.json");
    write_dataset(&path, &sample())?;
    let app = app(&path)?;

    let (status, html) = send(&app, Method::GET, "/?q=sql&mode=palabras").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Buscador académico"));
    assert!(html.contains(r#"value="palabras" checked"#));
    assert!(html.contains("Coincidencia: <strong>SQL</strong>"));

    Ok(())
}

#[tokio::test]
async fn test_reload_picks_up_new_dataset() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("data.json");
    write_dataset(&path, &sample())?;
    let app = app(&path)?;

    let (_, body) = send(&app, Method::GET, "/api/health").await?;
    let health: Value = serde_json::from_str(&body)?;
    assert_eq!(health["articles"], 2);
    assert_eq!(health["dataset_version"], 1);

    write_dataset(&path, &json!({ "tema": "Astronomía", "contenido": "Estrellas" }))?;
    let (status, body) = send(&app, Method::POST, "/api/reload").await?;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body)?;
    assert_eq!(health["articles"], 1);
    assert_eq!(health["dataset_version"], 2);

    let (_, body) = send(&app, Method::GET, "/api/search?q=redes").await?;
    let response: Value = serde_json::from_str(&body)?;
    assert_eq!(response["total"], 0);

    // A broken file keeps the previous dataset
    fs::write(&path, "not json")?;
    let (status, _) = send(&app, Method::POST, "/api/reload").await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (_, body) = send(&app, Method::GET, "/api/search?q=estrellas").await?;
    let response: Value = serde_json::from_str(&body)?;
    assert_eq!(response["total"], 1);

    Ok(())
}
