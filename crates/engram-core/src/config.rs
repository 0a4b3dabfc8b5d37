//! Configuration
//!
//! Environment-based configuration - single source of truth for all env vars.
//! `Settings::from_env()` builds one immutable value that is handed to each
//! singleton constructor at startup.

use std::path::PathBuf;

use tracing::{info, warn};

/// Which backend a provider routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Hosted API (HuggingFace for embeddings, Groq for chat)
    Cloud,
    /// Local Ollama instance
    Local,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Cloud => "cloud",
            ProviderKind::Local => "local",
        }
    }
}

/// Provider endpoints, model names, and credentials.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub embedding_provider: ProviderKind,
    pub chat_provider: ProviderKind,
    pub hf_api_token: Option<String>,
    pub hf_embedding_model: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_embedding_model: String,
}

/// Projection and clustering hyperparameters.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionSettings {
    /// Neighbourhood size for the projector (clamped to [2, M-1] at fit time)
    pub n_neighbors: usize,
    /// Minimum separation between projected points
    pub min_dist: f32,
    /// Upper bound on cluster count (actual K = min(n_clusters, M))
    pub n_clusters: usize,
    /// Visualisation box half-extent: max |coord| after normalisation
    pub scale: f32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            min_dist: 0.1,
            n_clusters: 5,
            scale: 10.0,
        }
    }
}

/// Relevance gate configuration for the tool surface.
#[derive(Debug, Clone, Copy)]
pub struct GateSettings {
    pub enabled: bool,
    /// Minimum confidence to keep a gated result
    pub threshold: f32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.5,
        }
    }
}

/// Complete application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub cache_dir: PathBuf,
    pub vector_store_path: PathBuf,
    pub model_dir: PathBuf,
    pub providers: ProviderSettings,
    pub projection: ProjectionSettings,
    pub gate: GateSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "./engram.db".to_string(),
            cors_origins: vec!["*".to_string()],
            host: "0.0.0.0".to_string(),
            port: 8000,
            cache_dir: PathBuf::from("./.cache"),
            vector_store_path: PathBuf::from("./.vector_store.json"),
            model_dir: PathBuf::from("./.models"),
            providers: ProviderSettings {
                embedding_provider: ProviderKind::Local,
                chat_provider: ProviderKind::Local,
                hf_api_token: None,
                hf_embedding_model: "nomic-ai/nomic-embed-text-v1.5".to_string(),
                groq_api_key: None,
                groq_model: "llama-3.1-8b-instant".to_string(),
                ollama_base_url: "http://localhost:11434".to_string(),
                ollama_model: "qwen2.5".to_string(),
                ollama_embedding_model: "nomic-embed-text".to_string(),
            },
            projection: ProjectionSettings::default(),
            gate: GateSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let hf_api_token = read_key("HF_API_TOKEN");
        let groq_api_key = read_key("GROQ_API_KEY");

        // Explicit routing wins; otherwise auto-detect from credential presence.
        let embedding_provider = match read_var("EMBEDDING_PROVIDER").as_deref() {
            Some("cloud") => ProviderKind::Cloud,
            Some("local") => ProviderKind::Local,
            Some(other) => {
                warn!("Unknown EMBEDDING_PROVIDER '{}', auto-detecting", other);
                auto_detect(&hf_api_token)
            }
            None => auto_detect(&hf_api_token),
        };
        let chat_provider = match read_var("CHAT_PROVIDER").as_deref() {
            Some("cloud") => ProviderKind::Cloud,
            Some("local") => ProviderKind::Local,
            Some(other) => {
                warn!("Unknown CHAT_PROVIDER '{}', auto-detecting", other);
                auto_detect(&groq_api_key)
            }
            None => auto_detect(&groq_api_key),
        };

        let settings = Self {
            database_url: read_var("DATABASE_URL").unwrap_or(defaults.database_url),
            cors_origins: read_var("CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            host: read_var("HOST").unwrap_or(defaults.host),
            port: read_parsed("PORT").unwrap_or(defaults.port),
            cache_dir: read_var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            vector_store_path: read_var("VECTOR_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vector_store_path),
            model_dir: read_var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            providers: ProviderSettings {
                embedding_provider,
                chat_provider,
                hf_api_token,
                hf_embedding_model: read_var("HF_EMBEDDING_MODEL")
                    .unwrap_or(defaults.providers.hf_embedding_model),
                groq_api_key,
                groq_model: read_var("GROQ_MODEL").unwrap_or(defaults.providers.groq_model),
                ollama_base_url: read_var("OLLAMA_BASE_URL")
                    .unwrap_or(defaults.providers.ollama_base_url),
                ollama_model: read_var("OLLAMA_MODEL").unwrap_or(defaults.providers.ollama_model),
                ollama_embedding_model: read_var("OLLAMA_EMBEDDING_MODEL")
                    .unwrap_or(defaults.providers.ollama_embedding_model),
            },
            projection: ProjectionSettings {
                n_neighbors: read_parsed("UMAP_N_NEIGHBORS")
                    .unwrap_or(defaults.projection.n_neighbors),
                min_dist: read_parsed("UMAP_MIN_DIST").unwrap_or(defaults.projection.min_dist),
                n_clusters: read_parsed("N_CLUSTERS").unwrap_or(defaults.projection.n_clusters),
                scale: defaults.projection.scale,
            },
            gate: GateSettings {
                enabled: read_var("GATE_ENABLED")
                    .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                    .unwrap_or(defaults.gate.enabled),
                threshold: read_parsed("GATE_THRESHOLD").unwrap_or(defaults.gate.threshold),
            },
        };

        settings.log_routing();
        settings
    }

    /// The filesystem path behind DATABASE_URL.
    ///
    /// Accepts `sqlite://{path}`, `sqlite:{path}`, or a bare path.
    pub fn database_path(&self) -> PathBuf {
        let url = self.database_url.as_str();
        let path = url
            .strip_prefix("sqlite:///")
            .or_else(|| url.strip_prefix("sqlite://"))
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        PathBuf::from(path)
    }

    /// Log which providers are routed, without exposing credentials.
    fn log_routing(&self) {
        info!(
            embedding_provider = self.providers.embedding_provider.as_str(),
            chat_provider = self.providers.chat_provider.as_str(),
            "Provider routing resolved"
        );
        if self.providers.embedding_provider == ProviderKind::Cloud
            && self.providers.hf_api_token.is_none()
        {
            warn!("EMBEDDING_PROVIDER=cloud but HF_API_TOKEN is not set");
        }
        if self.providers.chat_provider == ProviderKind::Cloud
            && self.providers.groq_api_key.is_none()
        {
            warn!("CHAT_PROVIDER=cloud but GROQ_API_KEY is not set");
        }
    }
}

fn auto_detect(credential: &Option<String>) -> ProviderKind {
    if credential.is_some() {
        ProviderKind::Cloud
    } else {
        ProviderKind::Local
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read a credential from environment, filtering empty values.
fn read_key(name: &str) -> Option<String> {
    read_var(name)
}

fn read_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    read_var(name).and_then(|v| v.parse().ok())
}
