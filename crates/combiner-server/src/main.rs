use anyhow::Result;
use combiner_common::proto::combiner_server::CombinerServer;
use combiner_core::builtin::BuiltinAggregator;
use combiner_core::Combiner;
use std::future::IntoFuture;
use std::net::SocketAddr;
use tokio::signal;
use tonic::transport::Server as TonicServer;
use tracing_subscriber::EnvFilter;

use combiner_server::app;
use combiner_server::config::{ServerConfig, DEFAULT_CONFIG_PATH};
use combiner_server::grpc;
use combiner_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  combiner-server [config.toml]    Start the HTTP and gRPC servers");
    eprintln!();
    eprintln!("Without a path, {DEFAULT_CONFIG_PATH} is used when present, else built-in defaults.");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("combiner=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        path => run_server(path).await,
    }
}

async fn run_server(config_path: Option<&str>) -> Result<()> {
    let config = ServerConfig::load_or_default(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        grpc_port = config.grpc_port,
        aggregator = %config.aggregator.kind,
        "combiner-server starting"
    );

    let model =
        BuiltinAggregator::new(config.aggregator.kind, config.aggregator.tags.clone()).into_model();
    let combiner = Combiner::new(model).map_err(|e| {
        tracing::error!(error = %e, "Aggregator cannot serve every transport");
        e
    })?;
    let (rest_contract, grpc_contract) = combiner.contracts();
    tracing::info!(rest = rest_contract, grpc = grpc_contract, "Aggregation contracts resolved");

    let state = AppState::new(combiner, config.clone());

    // gRPC server
    let grpc_addr: SocketAddr = config.grpc_addr().parse()?;
    let grpc_service = CombinerServer::new(grpc::CombinerServiceImpl::new(state.clone()))
        .max_decoding_message_size(config.grpc_max_message_bytes)
        .max_encoding_message_size(config.grpc_max_message_bytes);
    let grpc_server = TonicServer::builder()
        .add_service(grpc_service)
        .serve_with_shutdown(grpc_addr, async {
            signal::ctrl_c().await.ok();
        });

    // HTTP server
    let http_addr: SocketAddr = config.http_addr().parse()?;
    let http_app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(http_listener, http_app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .into_future();

    tracing::info!(grpc = %grpc_addr, http = %http_addr, "Server started");

    tokio::select! {
        result = grpc_server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "gRPC server error");
            }
        }
        result = http_server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
