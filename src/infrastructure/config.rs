use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub graphql: GraphQLConfig,
    #[serde(default)]
    pub csrf: CsrfConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl")]
    pub jwt_ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphQLConfig {
    #[serde(default = "default_true")]
    pub graphiql: bool,
    #[serde(default)]
    pub require_login: bool,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsrfConfig {
    #[serde(default = "default_csrf_cookie")]
    pub cookie_name: String,
    #[serde(default = "default_csrf_header")]
    pub header_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_ttl_seconds: default_jwt_ttl(),
        }
    }
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            graphiql: true,
            require_login: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_csrf_cookie(),
            header_name: default_csrf_header(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("KAKI")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("app.cors_origins")
                    .try_parsing(true),
            );
        let cfg = builder.build()?;
        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.graphql.require_login && self.auth.jwt_secret.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "Missing JWT secret. Set KAKI__AUTH__JWT_SECRET when graphql.require_login is enabled."
                    .into(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    pub fn jwt_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.jwt_ttl_seconds)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_jwt_ttl() -> u64 {
    60 * 60 * 8
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_csrf_cookie() -> String {
    "csrftoken".to_string()
}

fn default_csrf_header() -> String {
    "x-csrftoken".to_string()
}
