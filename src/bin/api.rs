use bounded_chat::{
    api::{start_server, ApiState},
    ats::AtsEvaluator,
    gemini::{resolve_model, GeminiClient, GeminiConfig},
    AnswerGenerator, AppConfig, ConversationPipeline, LanguageModel, LlmAnswerer,
    ScriptedAnswerer, SessionStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    info!("Bounded Chat - API Server");
    info!(
        "Port: {} | chunk size: {} | history window: {}",
        config.port, config.chunk_size, config.history.window
    );

    let (answerer, evaluator): (Arc<dyn AnswerGenerator>, Option<Arc<AtsEvaluator>>) =
        match config.gemini_api_key.as_deref() {
            Some(api_key) => {
                let model = resolve_model(
                    api_key,
                    &config.gemini_base_url,
                    config.gemini_model.as_deref(),
                )
                .await?;
                info!("Using Gemini model: {}", model);

                let mut gemini_config = GeminiConfig::new(api_key, model);
                gemini_config.base_url = config.gemini_base_url.clone();
                gemini_config.timeout = config.gemini_timeout;

                let client: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(gemini_config)?);
                let answerer: Arc<dyn AnswerGenerator> = Arc::new(LlmAnswerer::new(client.clone()));
                (answerer, Some(Arc::new(AtsEvaluator::new(client))))
            }
            None => {
                warn!("GEMINI_API_KEY not set; chat answers will echo queries and resume evaluation is disabled");
                let answerer: Arc<dyn AnswerGenerator> = Arc::new(ScriptedAnswerer::echo());
                (answerer, None)
            }
        };

    let state = ApiState {
        pipeline: Arc::new(ConversationPipeline::new(config.chunker()?, answerer)),
        sessions: SessionStore::with_limits(config.history, config.sessions),
        evaluator,
    };

    info!("Pipeline initialized, starting API server...");

    start_server(state, config.port).await?;

    Ok(())
}
