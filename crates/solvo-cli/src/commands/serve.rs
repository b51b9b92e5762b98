//! Serve command - HTTP upload endpoint.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use clap::Args;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument};

use solvo_core::{Document, DocumentPipeline, DocumentReport, SolvoConfig};

use super::load_config;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

/// Application state shared across routes.
#[derive(Clone)]
pub struct ServerState {
    pipeline: Arc<DocumentPipeline>,
}

pub async fn run(args: ServeArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    // Fails on bad extra labels before accepting uploads
    let app = router(&config)?;

    let addr = match args.bind {
        Some(addr) => addr,
        None => config.server.bind.parse()?,
    };

    start_server(addr, app).await
}

/// Build the routes around a single pipeline shared by every request.
pub fn router(config: &SolvoConfig) -> anyhow::Result<Router> {
    let state = ServerState {
        pipeline: Arc::new(DocumentPipeline::from_config(config)?),
    };

    Ok(Router::new()
        .route("/", get(|| async { Redirect::temporary("/api/health") }))
        .route("/api/health", get(|| async { "OK" }))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .with_state(state))
}

/// Starts the HTTP server.
#[instrument(skip(app))]
pub async fn start_server(addr: SocketAddr, app: Router) -> anyhow::Result<()> {
    info!("Upload server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Handler for `POST /upload`: one report per file part, in upload order.
async fn upload(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<DocumentReport>>, (StatusCode, String)> {
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            debug!("Skipping non-file form field {:?}", field.name());
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        documents.push(Document::new(filename, bytes.to_vec()));
    }

    if documents.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no files uploaded".to_string()));
    }

    info!("Received {} documents", documents.len());

    // PDF parsing and OCR block
    let pipeline = Arc::clone(&state.pipeline);
    let reports = tokio::task::spawn_blocking(move || pipeline.process_batch(&documents))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::multipart::{Form, Part};

    const STATEMENT: &str = "\
Activo Corriente 1.234.567,89
Existencias: 300.000,00
Inversiones en empresas del grupo y asociadas a C/P 17.850,00
Efectivo y otros líquidos: 95.000,00
Patrimonio Neto 900.000,00
Fondos Propios 850.000,00
Pasivo No Corriente 400.000,00
Pasivo Corriente 600.000,00
Resultado antes de impuestos -12.500,00
Riesgo 250.000,00
";

    async fn spawn_server() -> SocketAddr {
        let mut config = SolvoConfig::default();
        config.ocr.enabled = false;
        let app = router(&config).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn text_file(name: &str, content: &str) -> Part {
        Part::bytes(content.as_bytes().to_vec()).file_name(name.to_string())
    }

    #[tokio::test]
    async fn test_upload_reports_each_file_in_order() {
        let addr = spawn_server().await;
        let form = Form::new()
            .part("files", text_file("first.txt", STATEMENT))
            .text("note", "ignored")
            .part("files", text_file("second.txt", "Informe sin cifras"))
            .part("files", text_file("third.txt", STATEMENT));

        let resp = reqwest::Client::new()
            .post(format!("http://{}/upload", addr))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let reports: Vec<serde_json::Value> = resp.json().await.unwrap();
        let names: Vec<_> = reports.iter().map(|r| r["filename"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["first.txt", "second.txt", "third.txt"]);

        let statuses: Vec<_> = reports.iter().map(|r| r["status"].as_str().unwrap()).collect();
        assert_eq!(statuses, vec!["success", "failure", "success"]);
        assert_eq!(reports[1]["kind"], "extraction_incomplete");
        assert_eq!(reports[0]["ratios"]["liquidity"], "2.06");
        assert_eq!(reports[0]["ratios"]["total_assets_approximated"], true);
        assert_eq!(reports[2]["ratios"], reports[0]["ratios"]);
    }

    #[tokio::test]
    async fn test_upload_without_files_is_rejected() {
        let addr = spawn_server().await;
        let form = Form::new().text("note", "no attachments");

        let resp = reqwest::Client::new()
            .post(format!("http://{}/upload", addr))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(resp.text().await.unwrap(), "no files uploaded");
    }

    #[tokio::test]
    async fn test_health_route() {
        let addr = spawn_server().await;
        let body = reqwest::get(format!("http://{}/api/health", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "OK");
    }
}
