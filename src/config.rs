use std::env;
use std::path::PathBuf;

use secrecy::SecretString;

const DEV_JWT_SECRET: &str = "dev_secret_key_change_in_production";
const DEV_ADMIN_CODE: &str = "SECRET_ADMIN_CODE";

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    /// Code a caller must present to register with the `admin` role.
    pub admin_code: SecretString,
    /// Base URL used to build password-reset links.
    pub frontend_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub bcrypt_cost: u32,
    pub app_env: String,
    /// Outgoing mail relay. Reset links are only logged when unset.
    pub smtp: Option<SmtpSettings>,
}

#[derive(Clone, Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from: String,
}

impl SmtpSettings {
    /// Reads the relay settings; `None` unless host, username and password are all set.
    pub fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        let username = env::var("SMTP_USERNAME").ok()?;
        let password = env::var("SMTP_PASSWORD").ok()?;

        Some(Self {
            host,
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            from: env::var("SMTP_FROM").unwrap_or_else(|_| username.clone()),
            username,
            password: SecretString::from(password),
        })
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "QuizApp".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            ),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(1),
            admin_code: SecretString::from(
                env::var("ADMIN_CODE").unwrap_or_else(|_| DEV_ADMIN_CODE.to_string()),
            ),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(5 * 1024 * 1024),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            smtp: SmtpSettings::from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == DEV_JWT_SECRET {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.admin_code.expose_secret() == DEV_ADMIN_CODE {
            panic!("FATAL: ADMIN_CODE is using default value! Set ADMIN_CODE environment variable.");
        }

        if self.bcrypt_cost < 10 {
            panic!(
                "FATAL: BCRYPT_COST is {} but must be at least 10 in production.",
                self.bcrypt_cost
            );
        }

        if self.smtp.is_none() {
            panic!(
                "FATAL: SMTP is not configured! Set SMTP_HOST, SMTP_USERNAME and SMTP_PASSWORD so reset emails can be delivered."
            );
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "learner-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 5000,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            admin_code: SecretString::from("test-admin-code".to_string()),
            frontend_url: "http://localhost:3000".to_string(),
            upload_dir: std::env::temp_dir().join("learner-server-test-uploads"),
            max_upload_bytes: 1024 * 1024,
            bcrypt_cost: 4,
            app_env: "test".to_string(),
            smtp: None,
        }
    }
}
