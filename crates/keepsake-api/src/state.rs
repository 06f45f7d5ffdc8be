//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the REST API.
//! Services are generic over repository traits, but AppState pins them to
//! the concrete SQLite implementations. The generation provider and
//! embedder are constructed here, once, and injected -- lifecycle is
//! owned by the process entry point, not by first-use laziness.

use std::sync::Arc;

use keepsake_core::embedding::box_embedder::BoxEmbedder;
use keepsake_core::interview::InterviewService;
use keepsake_core::llm::box_provider::BoxGenerationProvider;
use keepsake_core::memory::extractor::FragmentExtractor;
use keepsake_core::memory::gate::VerificationGate;
use keepsake_core::memory::retrieval::GroundingRetriever;
use keepsake_core::narrative::NarrativeSynthesizer;
use keepsake_infra::config::Config;
use keepsake_infra::llm::gemini::{GeminiEmbedder, GeminiProvider};
use keepsake_infra::sqlite::fragment::SqliteFragmentRepository;
use keepsake_infra::sqlite::narrative::SqliteNarrativeRepository;
use keepsake_infra::sqlite::pool::DatabasePool;
use keepsake_infra::sqlite::seed::SqliteSeedRepository;
use keepsake_infra::sqlite::session::SqliteSessionRepository;

/// Concrete type aliases for the service generics pinned to the SQLite
/// implementations.
pub type ConcreteInterviewService =
    InterviewService<SqliteFragmentRepository, SqliteSeedRepository>;
pub type ConcreteExtractor =
    FragmentExtractor<SqliteFragmentRepository, SqliteSessionRepository>;
pub type ConcreteGate = VerificationGate<SqliteFragmentRepository>;
pub type ConcreteSynthesizer =
    NarrativeSynthesizer<SqliteFragmentRepository, SqliteNarrativeRepository>;

/// Shared application state holding all services.
///
/// The interview service, extractor, and synthesizer need the generation
/// provider; they are `None` when no API key is configured, and handlers
/// answer 503 for the operations that need them. The verification gate
/// and seed store work regardless.
#[derive(Clone)]
pub struct AppState {
    pub interview: Option<Arc<ConcreteInterviewService>>,
    pub extractor: Option<Arc<ConcreteExtractor>>,
    pub gate: Arc<ConcreteGate>,
    pub synthesizer: Option<Arc<ConcreteSynthesizer>>,
    pub seed_repo: Arc<SqliteSeedRepository>,
    pub narrative_repo: Arc<SqliteNarrativeRepository>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Config::from_env();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let db_pool = DatabasePool::new(&config.database_url()).await?;

        let gate = VerificationGate::new(SqliteFragmentRepository::new(db_pool.clone()));
        let seed_repo = Arc::new(SqliteSeedRepository::new(db_pool.clone()));
        let narrative_repo = Arc::new(SqliteNarrativeRepository::new(db_pool.clone()));

        let (interview, extractor, synthesizer) = match &config.gemini_api_key {
            None => (None, None, None),
            Some(api_key) => {
                let provider = Arc::new(BoxGenerationProvider::new(GeminiProvider::new(
                    api_key.clone(),
                    config.generation_model.clone(),
                )));
                let embedder = Arc::new(BoxEmbedder::new(GeminiEmbedder::new(
                    api_key.clone(),
                    config.embedding_model.clone(),
                )));

                let interview = InterviewService::new(
                    Arc::clone(&provider),
                    GroundingRetriever::new(Some(Arc::clone(&embedder))),
                    SqliteFragmentRepository::new(db_pool.clone()),
                    SqliteSeedRepository::new(db_pool.clone()),
                    config.generation_model.clone(),
                );

                let extractor = FragmentExtractor::new(
                    Arc::clone(&provider),
                    Some(Arc::clone(&embedder)),
                    SqliteFragmentRepository::new(db_pool.clone()),
                    SqliteSessionRepository::new(db_pool.clone()),
                    config.generation_model.clone(),
                );

                let synthesizer = NarrativeSynthesizer::new(
                    provider,
                    SqliteFragmentRepository::new(db_pool.clone()),
                    SqliteNarrativeRepository::new(db_pool.clone()),
                    config.generation_model.clone(),
                );

                (
                    Some(Arc::new(interview)),
                    Some(Arc::new(extractor)),
                    Some(Arc::new(synthesizer)),
                )
            }
        };

        Ok(Self {
            interview,
            extractor,
            gate: Arc::new(gate),
            synthesizer,
            seed_repo,
            narrative_repo,
            db_pool,
        })
    }
}
