use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use splitledger::auth::TokenKey;
use splitledger::routes;
use splitledger::settings::{Settings, Storage};
use splitledger::store::{LedgerStore, MemoryStore, MongoStore};
use splitledger::Ledger;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let settings = Settings::new().expect("invalid settings");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "splitledger={level},actix_web={level}",
                level = settings.log.level
            ))
        }))
        .init();

    let store: Arc<dyn LedgerStore> = match &settings.storage {
        Storage::Memory => {
            tracing::warn!("Using in-memory storage, nothing will be persisted");
            Arc::new(MemoryStore::new())
        }
        Storage::Mongo { uri, database } => {
            let store = MongoStore::connect(uri, database)
                .await
                .expect("failed to connect");
            tracing::info!(database = %database, "Connected to MongoDB");
            Arc::new(store)
        }
    };

    let ledger = web::Data::new(Ledger::new(store));
    let token_key = web::Data::new(TokenKey::new(&settings.auth.secret));
    let allowed_origin = settings.cors.allowed_origin.clone();

    tracing::info!(host = %settings.http.host, port = settings.http.port, "Starting server");
    HttpServer::new(move || {
        let cors = match &allowed_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header(),
            None => Cors::permissive(),
        };
        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(ledger.clone())
            .app_data(token_key.clone())
            .configure(routes::configure)
    })
    .bind((settings.http.host.as_str(), settings.http.port))?
    .run()
    .await
}
