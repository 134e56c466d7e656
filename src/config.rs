use std::collections::HashSet;

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: Option<String>) -> anyhow::Result<Self> {
        match raw.as_deref().map(str::trim) {
            None | Some("") | Some("development") | Some("dev") => Ok(Self::Development),
            Some("production") | Some("prod") => Ok(Self::Production),
            Some(other) => anyhow::bail!("APP_ENV must be development or production, got {other:?}"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = required(&lookup, "DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required(&lookup, "JWT_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "tasktrack".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "tasktrack-clients".into()),
        };
        let environment = Environment::parse(lookup("APP_ENV"))?;
        let port = match lookup("PORT").or_else(|| lookup("APP_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got {raw:?}"))?,
            None => 3000,
        };

        let mut cors_origins: Vec<String> = ["CORS_ORIGIN_WEB", "CORS_ORIGIN_MOBILE"]
            .iter()
            .filter_map(|key| lookup(*key))
            .collect();
        if let Some(list) = lookup("CORS_ORIGINS") {
            cors_origins.extend(list.split(',').map(str::to_string));
        }
        let mut seen = HashSet::new();
        let cors_origins: Vec<String> = cors_origins
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty() && seen.insert(o.clone()))
            .collect();

        if environment.is_production() && cors_origins.is_empty() {
            anyhow::bail!("at least one of CORS_ORIGIN_WEB, CORS_ORIGIN_MOBILE or CORS_ORIGINS is required in production");
        }

        Ok(Self {
            database_url,
            jwt,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            environment,
            cors_origins,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub backend_url: String,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = required(&lookup, "BACKEND_URL")?
            .trim_end_matches('/')
            .to_string();
        let port = match lookup("GATEWAY_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("GATEWAY_PORT must be a valid port number, got {raw:?}"))?,
            None => 3001,
        };
        Ok(Self {
            backend_url,
            host: lookup("GATEWAY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            environment: Environment::parse(lookup("APP_ENV"))?,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{key} environment variable is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn loads_with_defaults() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/tasks"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.jwt.issuer, "tasktrack");
        assert!(cfg.cors_origins.is_empty());
    }

    #[test]
    fn missing_secret_fails() {
        let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn blank_database_url_fails() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "  "),
            ("JWT_SECRET", "s"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn collects_cors_origins() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("CORS_ORIGIN_WEB", "https://web.example.com/"),
            ("CORS_ORIGINS", "https://a.example.com, https://b.example.com"),
            ("PORT", "8080"),
        ]))
        .expect("config");
        assert_eq!(
            cfg.cors_origins,
            vec![
                "https://web.example.com",
                "https://a.example.com",
                "https://b.example.com"
            ]
        );
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn repeated_cors_origins_are_kept_once() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("CORS_ORIGIN_WEB", "https://web.example.com"),
            ("CORS_ORIGIN_MOBILE", "https://m.example.com"),
            ("CORS_ORIGINS", "https://web.example.com/,https://m.example.com,https://web.example.com"),
        ]))
        .expect("config");
        assert_eq!(
            cfg.cors_origins,
            vec!["https://web.example.com", "https://m.example.com"]
        );
    }

    #[test]
    fn production_requires_cors_origin() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("APP_ENV", "production"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CORS"));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("PORT", "http"),
        ]))
        .is_err());
    }

    #[test]
    fn gateway_trims_backend_url() {
        let cfg = GatewayConfig::from_lookup(lookup_from(&[(
            "BACKEND_URL",
            "http://localhost:3000/",
        )]))
        .expect("config");
        assert_eq!(cfg.backend_url, "http://localhost:3000");
        assert_eq!(cfg.port, 3001);
    }
}
