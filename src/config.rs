use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Settings for the Pexels image search provider.
#[derive(Debug, Clone, Deserialize)]
pub struct PexelsConfig {
    /// `None` leaves the search proxy unconfigured; every search then fails
    /// and the health check reports the service as misconfigured.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub password_min_len: usize,
    pub jwt: JwtConfig,
    pub pexels: PexelsConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "promptpix".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "promptpix-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24 * 30),
        };
        let pexels = PexelsConfig {
            api_key: std::env::var("PEXELS_API_KEY")
                .or_else(|_| std::env::var("AI_API_KEY"))
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            base_url: std::env::var("PEXELS_BASE_URL")
                .unwrap_or_else(|_| "https://api.pexels.com".into()),
            timeout_secs: env_parse("PEXELS_TIMEOUT_SECS").unwrap_or(10),
        };
        let port = std::env::var("APP_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(5000);

        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            password_min_len: env_parse("PASSWORD_MIN_LEN").unwrap_or(6),
            jwt,
            pexels,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
