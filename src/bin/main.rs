use bounded_chat::{
    gemini::{resolve_model, GeminiClient, GeminiConfig},
    AnswerGenerator, AppConfig, ConversationPipeline, HistoryManager, LlmAnswerer,
    ScriptedAnswerer,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    dotenv::dotenv().ok();
    let config = AppConfig::from_env()?;

    let answerer: Arc<dyn AnswerGenerator> = match config.gemini_api_key.as_deref() {
        Some(api_key) => {
            let model = resolve_model(
                api_key,
                &config.gemini_base_url,
                config.gemini_model.as_deref(),
            )
            .await?;

            let mut gemini_config = GeminiConfig::new(api_key, model);
            gemini_config.base_url = config.gemini_base_url.clone();
            gemini_config.timeout = config.gemini_timeout;
            Arc::new(LlmAnswerer::new(Arc::new(GeminiClient::new(gemini_config)?)))
        }
        None => {
            warn!("GEMINI_API_KEY not set; answers will echo your queries");
            Arc::new(ScriptedAnswerer::echo())
        }
    };

    let pipeline = ConversationPipeline::new(config.chunker()?, answerer);
    // One session for the lifetime of the process
    let mut history = HistoryManager::with_config(config.history);

    info!("Chat session started");
    println!("Ask a question (empty line or Ctrl-D to quit).");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }

        let outcome = pipeline.process_query(&line, &mut history).await;

        for failure in &outcome.failures {
            eprintln!(
                "Model error on chunk {} of {}: {}",
                failure.chunk.index + 1,
                outcome.chunk_count,
                failure.error
            );
        }

        if !outcome.answer.is_empty() {
            println!("{}", outcome.answer);
        }
    }

    info!("Chat session ended");
    Ok(())
}
