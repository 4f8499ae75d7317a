use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expire_days: i64,
    pub cookie_expire_days: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_email: String,
}

/// Whether the books collection is writable by anyone or guarded by
/// session + ownership checks. The two modes are mutually exclusive
/// deployment policies, picked once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooksPolicy {
    Open,
    Protected,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub jwt: JwtConfig,
    pub smtp: Option<SmtpConfig>,
    pub environment: String,
    pub public_url: String,
    pub books_policy: BooksPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            expire_days: std::env::var("JWT_EXPIRE_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            cookie_expire_days: std::env::var("JWT_COOKIE_EXPIRE_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: std::env::var("SMTP_PORT")
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(587),
                username: std::env::var("SMTP_EMAIL").unwrap_or_default(),
                password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
                from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "Bookstore".into()),
                from_email: std::env::var("FROM_EMAIL")
                    .unwrap_or_else(|_| "noreply@bookstore.local".into()),
            }),
            Err(_) => None,
        };

        let books_policy = match std::env::var("BOOKS_POLICY").as_deref() {
            Ok("open") => BooksPolicy::Open,
            _ => BooksPolicy::Protected,
        };

        Ok(Self {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".data")),
            jwt,
            smtp,
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            public_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            books_policy,
        })
    }
}
