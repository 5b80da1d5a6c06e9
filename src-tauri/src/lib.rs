use rug_sage::backend::{ChatBackend, RagBackend};
use rug_sage::retrieval::Retriever;
use rug_sage::{config, server};
use std::sync::Arc;
use tauri::Manager;

/// Backend shared by the command handlers.
struct Backend(Arc<dyn ChatBackend>);

/// Answer `question` with the RAG chain, outside the page's transcript.
#[tauri::command]
async fn generate_response(
    backend: tauri::State<'_, Backend>,
    question: String,
    chat_history: String,
) -> Result<String, String> {
    backend
        .0
        .generate_response(&question, &chat_history)
        .await
        .map_err(|e| e.to_string())
}

/// Summarize transcript text.
#[tauri::command]
async fn summarizer(
    backend: tauri::State<'_, Backend>,
    chat_history: String,
) -> Result<String, String> {
    backend
        .0
        .summarize(&chat_history)
        .await
        .map_err(|e| e.to_string())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let config = Arc::new(config::AppConfig::load()?);
            let llm_settings = config::load_llm_settings(&config)?;

            let http = reqwest::Client::new();
            let retriever = Retriever::new(http.clone(), &config.retrieval)?;
            app.manage(Backend(Arc::new(RagBackend::new(
                &http,
                &llm_settings,
                retriever,
            ))));

            // The window loads the page served by the embedded Axum server
            tauri::async_runtime::spawn(async move {
                log::info!(
                    "Starting embedded Axum server on port {}",
                    config.server.port
                );

                if let Err(e) = server::start_server(config, llm_settings).await {
                    log::error!("Axum server failed: {}", e);
                }
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![generate_response, summarizer])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
