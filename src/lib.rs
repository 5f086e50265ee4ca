//! Asynchronous KYC/KYB verification orchestration engine
//!
//! A request starts one verification; the engine durably schedules it on a
//! Redis-backed queue, fans out work to verification agents, recursively
//! launches dependent verifications for each ultimate beneficial owner of
//! a business, waits for them under a join deadline, and compiles a single
//! decision with rationale.
//!
//! # Architecture
//!
//! - [`api`]: axum façade for submission, status, reports, queue info, auth
//! - [`workflow`]: the two state machines, fan-out/join, the queue worker
//! - [`agents`]: agent runtime plus the individual and business catalogs
//! - [`documents`]: fetch/rasterize/classify/extract pipeline
//! - [`integrations`]: provider capability traits and concrete clients
//! - [`llm`]: bounded LLM pool and the Bedrock client
//! - [`queue`]: durable FIFO job queue over Redis
//! - [`store`]: PostgreSQL persistence for all engine entities

pub mod agents;
pub mod api;
pub mod config;
pub mod documents;
pub mod error;
pub mod integrations;
pub mod llm;
pub mod queue;
pub mod store;
pub mod utils;
pub mod workflow;

pub use config::Settings;
pub use error::EngineError;

/// Production wiring: build the engine dependency graph from settings
pub mod bootstrap {
    use anyhow::{Context, Result};
    use std::sync::Arc;

    use crate::agents::EngineDeps;
    use crate::config::Settings;
    use crate::documents::{DocumentPipeline, PdfiumRasterizer, RasterPool};
    use crate::integrations::{
        MysqlRecordStore, OfacClient, PersonaClient, RegistryClient, S3BlobStore, SiftClient,
    };
    use crate::llm::{BedrockClient, LlmPool};
    use crate::queue::JobQueue;
    use crate::store::PgStore;

    /// Initialize tracing from `LOG_LEVEL` / `RUST_LOG`
    pub fn init_logging(settings: &Settings) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.log_level.clone()));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Connect the store, create the schema, and assemble every provider
    /// client behind the engine's capability traits
    pub async fn build_deps(settings: &Settings) -> Result<(Arc<EngineDeps>, PgStore)> {
        let store = PgStore::connect(&settings.postgres_url(), settings.database_pool_size)
            .await
            .context("Engine store connection failed")?;
        store.init_schema().await?;

        let records = Arc::new(MysqlRecordStore::new(settings.external_db_url()));

        let persona = Arc::new(
            PersonaClient::new(settings.persona_api_key.clone().unwrap_or_default())
                .context("Persona client construction failed")?,
        );
        let sift = Arc::new(
            SiftClient::new(settings.sift_api_key.clone().unwrap_or_default())
                .context("Sift client construction failed")?,
        );
        let sanctions = Arc::new(
            OfacClient::new(settings.ofac_api_url.clone())
                .context("Sanctions client construction failed")?,
        );
        let registry = Arc::new(
            RegistryClient::new(settings.registry_api_url.clone())
                .context("Registry client construction failed")?,
        );

        let blobs = Arc::new(
            S3BlobStore::from_env(settings.aws_s3_bucket.clone(), settings.aws_region.clone())
                .await,
        );
        let bedrock = Arc::new(BedrockClient::from_env().await);
        let llm = LlmPool::new(bedrock, settings.llm_max_concurrency, settings.model_id.clone());

        let raster = RasterPool::new(Arc::new(PdfiumRasterizer), settings.raster_max_concurrency);
        let documents =
            DocumentPipeline::new(persona.clone(), blobs.clone(), llm.clone(), raster);

        let deps = Arc::new(EngineDeps {
            store: Arc::new(store.clone()),
            records,
            id_provider: persona,
            fraud: sift,
            sanctions,
            registry,
            blobs,
            llm,
            documents,
        });

        Ok((deps, store))
    }

    /// Connect the durable job queue
    pub async fn build_queue(settings: &Settings) -> Result<JobQueue> {
        JobQueue::connect(
            &settings.redis_connection_url(),
            settings.queue_name.clone(),
            settings.job_timeout,
            settings.keep_result,
        )
        .await
    }
}
