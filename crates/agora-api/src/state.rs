//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the HTTP and
//! WebSocket handlers. The core engines are generic over repository and
//! provider traits; AppState pins them to the concrete infra
//! implementations.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;

use agora_core::intake::MessageIntake;
use agora_core::personas::PersonaDirectory;
use agora_core::registry::ConnectionRegistry;
use agora_core::repository::ChannelRepository;
use agora_core::responder::ResponderEngine;
use agora_core::scheduler::AutoChatScheduler;
use agora_infra::config::load_config;
use agora_infra::llm::gemini::GeminiProvider;
use agora_infra::sqlite::channel::SqliteChannelRepository;
use agora_infra::sqlite::message::SqliteMessageRepository;
use agora_infra::sqlite::pool::{DatabasePool, default_data_dir};
use agora_types::config::AgoraConfig;
use agora_types::message::Channel;

/// Concrete type aliases for the engine generics pinned to infra
/// implementations.
pub type ConcreteResponder = ResponderEngine<SqliteMessageRepository, GeminiProvider>;
pub type ConcreteIntake = MessageIntake<SqliteMessageRepository, GeminiProvider>;
pub type ConcreteScheduler = AutoChatScheduler<SqliteMessageRepository, GeminiProvider>;

/// Channels created on first startup. Existing rows are never modified.
fn default_channels() -> Vec<Channel> {
    let channels = [
        ("1", "general", "Talk about anything"),
        ("2", "games", "Gaming talk"),
        ("3", "music", "Share what you're listening to"),
        ("4", "hobbies", "Show off your hobbies"),
        ("5", "news", "Link and discuss the latest"),
    ];
    channels
        .into_iter()
        .map(|(id, name, description)| Channel {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            created_at: Utc::now(),
        })
        .collect()
}

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub message_repo: Arc<SqliteMessageRepository>,
    pub channel_repo: Arc<SqliteChannelRepository>,
    pub registry: Arc<ConnectionRegistry>,
    pub personas: Arc<PersonaDirectory>,
    pub intake: Arc<ConcreteIntake>,
    pub scheduler: Arc<ConcreteScheduler>,
    pub config: AgoraConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: connect to the database, seed
    /// channels, load personas, wire the engines.
    pub async fn init(
        data_dir: Option<PathBuf>,
        personas_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        let db_url = format!("sqlite://{}?mode=rwc", data_dir.join("agora.db").display());
        let db_pool = DatabasePool::new(&db_url).await?;

        let message_repo = Arc::new(SqliteMessageRepository::new(db_pool.clone()));
        let channel_repo = Arc::new(SqliteChannelRepository::new(db_pool));
        channel_repo.seed_channels(&default_channels()).await?;

        let personas_dir = personas_dir.unwrap_or_else(|| data_dir.join("personas"));
        let personas = Arc::new(PersonaDirectory::load(&personas_dir));
        if personas.is_empty() {
            tracing::warn!(
                dir = %personas_dir.display(),
                "no persona profiles loaded, AI replies will use the fallback persona"
            );
        }

        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable is required"))?;
        let provider = Arc::new(GeminiProvider::new(
            SecretString::from(api_key),
            &config.llm,
        )?);

        let registry = Arc::new(ConnectionRegistry::new());

        let responder: Arc<ConcreteResponder> = Arc::new(ResponderEngine::new(
            message_repo.clone(),
            provider,
            personas.clone(),
            registry.clone(),
            config.llm.clone(),
        ));

        let intake = Arc::new(MessageIntake::new(
            message_repo.clone(),
            responder.clone(),
            registry.clone(),
        ));

        let scheduler = Arc::new(AutoChatScheduler::new(
            message_repo.clone(),
            responder,
            config.auto_chat.clone(),
        ));

        Ok(AppState {
            message_repo,
            channel_repo,
            registry,
            personas,
            intake,
            scheduler,
            config,
            data_dir,
        })
    }
}
