//! Default values shared by the config structs.

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_EMBEDDING_DIM: usize = 768;
pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "http://127.0.0.1:11434";
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_GENERATION_MODEL: &str = "llama3.1";
pub const DEFAULT_GENERATION_ENDPOINT: &str = "http://127.0.0.1:11434";
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PROMPT_CHAR_LIMIT: usize = 12_000;
pub const DEFAULT_REFRESH_SAMPLE_LIMIT: usize = 20;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;
pub const DEFAULT_UPDATE_THRESHOLD: f64 = 0.50;
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.85;
pub const DEFAULT_SPLIT_VARIANCE_THRESHOLD: f64 = 0.40;
pub const DEFAULT_DRIFT_UPDATE: f64 = 0.20;
pub const DEFAULT_MIN_CONTRIBUTION: f64 = 0.05;
pub const DEFAULT_MIN_RESPONSES_PER_THEME: usize = 2;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_KEYWORDS: usize = 10;
pub const DEFAULT_EMBED_PARALLELISM: usize = 8;
pub const DEFAULT_LLM_CONCURRENCY: usize = 1;
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_MIN_WORD_LENGTH: usize = 3;
pub const DEFAULT_MAX_STOPWORDS_IN_PHRASE: usize = 1;
