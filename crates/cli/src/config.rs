use std::time::Duration;

/// Runtime configuration, environment variables over local-dev defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ollama_host: String,
    pub ollama_port: u16,
    pub llm_model: String,
    pub neo4j_uri: String,
    pub neo4j_username: String,
    pub neo4j_password: String,
    pub doc_dir: String,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_host: "localhost".to_string(),
            ollama_port: 11434,
            llm_model: "llama3.2:3b".to_string(),
            neo4j_uri: "bolt://localhost:7687".to_string(),
            neo4j_username: "neo4j".to_string(),
            neo4j_password: "testpass".to_string(),
            doc_dir: "input-dir".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("OLLAMA_HOST") {
            config.ollama_host = v;
        }
        if let Ok(v) = std::env::var("OLLAMA_PORT") {
            if let Ok(port) = v.parse() {
                config.ollama_port = port;
            }
        }
        if let Ok(v) = std::env::var("OLLAMA_LLM_MODEL") {
            config.llm_model = v;
        }
        if let Ok(v) = std::env::var("NEO4J_URI") {
            config.neo4j_uri = v;
        }
        if let Ok(v) = std::env::var("NEO4J_USERNAME") {
            config.neo4j_username = v;
        }
        if let Ok(v) = std::env::var("NEO4J_PASSWORD") {
            config.neo4j_password = v;
        }
        if let Ok(v) = std::env::var("DOC_DIR") {
            config.doc_dir = v;
        }
        if let Ok(v) = std::env::var("REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                config.request_timeout_secs = secs;
            }
        }

        config
    }

    pub fn ollama_base_url(&self) -> String {
        format!("http://{}:{}", self.ollama_host, self.ollama_port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
