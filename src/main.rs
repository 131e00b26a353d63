mod domain;
mod application;
mod adapters;
mod cli;
mod settings;

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::adapters::{
    coco::catalog::CocoCatalog,
    fs::upload_store::FsUploadStore,
    http::{router, state::HttpState},
    onnx::{model_catalog::OnnxModelCatalog, siamese_engine::SiameseEngine},
};
use crate::application::services::SearchService;
use crate::cli::Args;
use crate::domain::model::{ModelConfig, ModelSize};
use crate::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load(&args.settings)?;
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }

    // 1. Logs: RUST_LOG si está definido, si no el nivel de la configuración
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // 2. Variante del modelo: cualquier valor distinto de small/large aborta el arranque
    let size: ModelSize = args.size.parse()?;
    let config = ModelConfig::for_size(size);
    tracing::info!("🔧 Cargando modelo '{}'...", size);

    // 3. Adaptadores: checkpoint, dataset y directorio de subidas
    let checkpoint = OnnxModelCatalog::new(&settings.checkpoint_dir).resolve(&config)?;
    let engine = Arc::new(SiameseEngine::load(&checkpoint, config)?);
    let catalog = Arc::new(CocoCatalog::load(
        &settings.coco_data,
        &settings.coco_subset,
        &settings.coco_year,
    )?);
    let uploads = Arc::new(FsUploadStore::new(&settings.app_test_data));

    // 4. Casos de uso, compartidos por todas las peticiones
    let search = Arc::new(SearchService::new(engine, catalog, uploads));
    tracing::info!("Clases one-shot activas: {:?}", search.active_classes());
    let app = router(HttpState { search });

    // 5. Lanzar el servidor
    let addr = settings.bind_addr();
    tracing::info!("🚀 VisualSearch iniciado en http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("No se pudo escuchar Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
