//! Cellar Server
//!
//! gRPC server for a personal wine and beer cellar with social tasting sessions.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Server;
use tracing::{info, warn};

use cellar_core::config::{Config, database_path, load_config, upload_dir};
use cellar_core::tracing_init::init_tracing;
use cellar_proto::v1::account_service_server::AccountServiceServer;
use cellar_proto::v1::auth_service_server::AuthServiceServer;
use cellar_proto::v1::cellar_service_server::CellarServiceServer;
use cellar_proto::v1::guest_tasting_service_server::GuestTastingServiceServer;
use cellar_proto::v1::invite_service_server::InviteServiceServer;
use cellar_proto::v1::tasting_service_server::TastingServiceServer;

use cellar_server::auth::TokenService;
use cellar_server::cellar::CellarManager;
use cellar_server::media::{LabelScanner, LocalObjectStore};
use cellar_server::notify::WebhookNotifier;
use cellar_server::server::{
    AccountServiceImpl, AuthServiceImpl, CellarServiceImpl, GuestTastingServiceImpl,
    InviteServiceImpl, TastingServiceImpl, owner_interceptor,
};
use cellar_server::storage::CellarDatabase;
use cellar_server::tasting::{GuestAccess, SessionManager, SessionPolicy};

#[derive(Parser, Debug)]
#[command(name = "cellar-server")]
#[command(version, about = "Cellar server - bottles, tasting sessions and guest scoring")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file (overrides the config file).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret key.
    #[arg(long, env = "CELLAR_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    apply_args(&mut config, &args);

    init_tracing("cellar_server=info", config.server.log_json);

    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {e}", config.server.addr))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        "Starting cellar-server"
    );

    if args.jwt_secret.len() < 32 {
        warn!("JWT secret is shorter than 32 bytes");
    }

    let db_path = config
        .server
        .database_path
        .clone()
        .or_else(database_path)
        .ok_or_else(|| anyhow::anyhow!("Cannot determine database path"))?;
    info!(path = %db_path.display(), "Opening cellar database");
    let db = CellarDatabase::open(&db_path).await?;

    let tokens = Arc::new(TokenService::new(
        args.jwt_secret.as_bytes(),
        config.auth.owner_token_ttl_secs,
        config.auth.guest_token_ttl_secs,
    ));

    let notifier = WebhookNotifier::new(&config.notifications)?;
    if notifier.is_enabled() {
        info!("Guest-joined webhook enabled");
    }

    let upload_dir = config
        .media
        .upload_dir
        .clone()
        .or_else(upload_dir)
        .ok_or_else(|| anyhow::anyhow!("Cannot determine upload directory"))?;
    let store = LocalObjectStore::new(
        upload_dir,
        &config.media.public_base_url,
        config.media.max_upload_bytes,
    );
    let scanner = match config.media.label_scan_url.as_deref() {
        Some(url) if !url.is_empty() => Some(LabelScanner::new(url)?),
        _ => {
            info!("Label scanning disabled (no endpoint configured)");
            None
        }
    };

    let policy = SessionPolicy {
        invite_ttl_secs: config.tasting.invite_ttl_secs,
        join_code_attempts: config.tasting.join_code_attempts,
    };
    let sessions = SessionManager::new(db.clone(), policy);
    let guests = GuestAccess::new(db.clone(), (*tokens).clone(), notifier);

    // Build services
    let auth = AuthServiceImpl::new(db.clone(), Arc::clone(&tokens));
    let account = AccountServiceImpl::new(db.clone());
    let cellar = CellarServiceImpl::new(CellarManager::new(db), store, scanner);
    let tasting = TastingServiceImpl::new(sessions.clone(), guests.clone());
    let invite = InviteServiceImpl::new(guests.clone());
    let guest = GuestTastingServiceImpl::new(guests, sessions);

    let owner_check = owner_interceptor(Arc::clone(&tokens));

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<AuthServiceServer<AuthServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<CellarServiceServer<CellarServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<TastingServiceServer<TastingServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<GuestTastingServiceServer<GuestTastingServiceImpl>>()
        .await;

    let grpc_router = Server::builder()
        .http2_keepalive_interval(Some(Duration::from_secs(30)))
        .http2_keepalive_timeout(Some(Duration::from_secs(10)))
        .add_service(health_service)
        .add_service(AuthServiceServer::new(auth))
        .add_service(InviteServiceServer::new(invite))
        .add_service(GuestTastingServiceServer::new(guest))
        .add_service(AccountServiceServer::with_interceptor(
            account,
            owner_check.clone(),
        ))
        .add_service(InterceptedService::new(
            cellar.into_server(),
            owner_check.clone(),
        ))
        .add_service(TastingServiceServer::with_interceptor(
            tasting,
            owner_check,
        ));

    info!(addr = %addr, "Cellar server listening");

    tokio::select! {
        result = grpc_router.serve(addr) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Cellar server stopped");
    Ok(())
}

/// CLI flags take precedence over config file and environment.
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(addr) = args.addr {
        config.server.addr = addr.to_string();
    }
    if let Some(path) = &args.db_path {
        config.server.database_path = Some(path.clone());
    }
    if args.log_json {
        config.server.log_json = true;
    }
}
