use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use convolens_api::{AnalyzeRequest, AnalyzeResponse, ConversationAnalyzer};
use convolens_config::{load_config, ConvolensConfig};
use convolens_core::{
    load_taxonomy, ClassifierConfig, HierarchicalClassifier, Summarizer, TranscriptNormalizer,
};
use convolens_llm::{
    ClientRegistry, HttpChatClient, HttpChatClientConfig, Scenario, UsageMeter,
};

#[derive(Debug, Parser)]
#[command(name = "convolens-server")]
struct Args {
    #[arg(long, default_value = "config/convolens.yaml")]
    config: PathBuf,
    /// Override the configured listen address.
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Analyze a transcript file and print the result instead of serving.
    #[arg(long)]
    oneshot: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    analyzer: Arc<ConversationAnalyzer>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config).context("load configuration failed")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone())),
        )
        .init();

    let analyzer = Arc::new(build_analyzer(&config).context("initialize analyzer failed")?);

    if let Some(path) = args.oneshot {
        return run_oneshot(&analyzer, &path).await;
    }

    let listen = match args.listen {
        Some(addr) => addr,
        None => SocketAddr::new(
            config
                .server
                .host
                .parse::<IpAddr>()
                .context("invalid server.host")?,
            config.server.port,
        ),
    };

    let state = AppState { analyzer };
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ai/analyze", post(analyze))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .context("bind server listener failed")?;
    println!("convolens-server listening on http://{}", listen);
    axum::serve(listener, app)
        .await
        .context("server terminated with error")
}

/// Composition root: clients, usage accounting, taxonomy and the analyzer
/// are all constructed here once and shared read-only afterwards.
fn build_analyzer(config: &ConvolensConfig) -> anyhow::Result<ConversationAnalyzer> {
    let usage = Arc::new(UsageMeter::new());
    let api_key = config.llm.resolve_api_key();

    let classification_client = HttpChatClient::new(
        HttpChatClientConfig {
            endpoint: config.llm.chat_endpoint(),
            api_key: api_key.clone(),
            model: config.classification.model.clone(),
            temperature: config.classification.temperature,
            timeout_secs: config.llm.timeout_secs,
        },
        usage.clone(),
    )
    .context("build classification client failed")?;

    let summary_client = HttpChatClient::new(
        HttpChatClientConfig {
            endpoint: config.llm.chat_endpoint(),
            api_key,
            model: config.summary.model.clone(),
            temperature: config.summary.temperature,
            timeout_secs: config.llm.timeout_secs,
        },
        usage,
    )
    .context("build summary client failed")?;

    let registry = ClientRegistry::new()
        .with_client(Scenario::Classification, Arc::new(classification_client))
        .with_client(Scenario::Summary, Arc::new(summary_client));

    let taxonomy = Arc::new(
        load_taxonomy(
            Path::new(&config.taxonomy.csv_path),
            config.classification.level3_parents.iter().cloned(),
        )
        .context("load taxonomy failed")?,
    );
    info!(csv_path = %config.taxonomy.csv_path, "taxonomy loaded");

    let classifier = HierarchicalClassifier::new(
        taxonomy,
        registry
            .get(Scenario::Classification)
            .context("classification client missing from registry")?,
        ClassifierConfig {
            max_attempts: config.classification.max_attempts,
            max_tokens: config.classification.max_tokens,
        },
    );
    let summarizer = Summarizer::new(
        registry
            .get(Scenario::Summary)
            .context("summary client missing from registry")?,
        config.summary.max_tokens,
    );

    Ok(ConversationAnalyzer::new(
        TranscriptNormalizer::new(),
        classifier,
        summarizer,
    ))
}

/// Local entry point: analyze one transcript file without the HTTP layer.
async fn run_oneshot(analyzer: &ConversationAnalyzer, path: &Path) -> anyhow::Result<()> {
    let conversation =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let message_num = conversation.lines().count().to_string();

    let request = AnalyzeRequest {
        conversation_id: "local".to_string(),
        user_no: "user".to_string(),
        conversation,
        message_num,
    };
    let response = analyzer.analyze(&request).await;

    println!("会话ID: {}", response.conversation_id);
    println!("用户编号: {}", response.user_no);
    println!("分类: {}", response.category);
    println!("摘要: {}", response.summary);
    println!("状态: {}", response.message);
    Ok(())
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<AnalyzeResponse> {
    Json(state.analyzer.analyze(&request).await)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": 200,
        "response": {"status": "healthy"},
        "message": "success"
    }))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "convolens",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "对话分析服务：清洗、分层分类与摘要"
    }))
}
