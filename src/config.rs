use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub razorpay: RazorpayConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    #[serde(default = "default_razorpay_base_url")]
    pub base_url: String,
    /// RazorpayX 付款账户 (customer identifier 账号)
    pub account_number: String,
    #[serde(default = "default_payout_mode")]
    pub payout_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub gst_rate_percent: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            gst_rate_percent: 18.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub reconcile_interval_secs: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: 300,
        }
    }
}

fn default_razorpay_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_payout_mode() -> String {
    "IMPS".to_string()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            // 有配置文件：先解析再用环境变量覆盖
            Ok(config_str) => Self::parse(&config_str)?,
            // 无配置文件：使用环境变量与默认值构建
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env_defaults()?,
            Err(e) => {
                return Err(format!("Unable to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    fn from_env_defaults() -> Result<Self, Box<dyn std::error::Error>> {
        fn get_env(name: &str) -> Option<String> {
            env::var(name).ok()
        }
        fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
            env::var(name)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        let database_url = get_env("DATABASE_URL")
            .ok_or("DATABASE_URL is not set and no config.toml was found")?;

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET")
                    .unwrap_or_else(|| "change-me-in-production".to_string()),
                access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
            },
            razorpay: RazorpayConfig {
                key_id: get_env("RAZORPAY_KEY_ID").unwrap_or_default(),
                key_secret: get_env("RAZORPAY_KEY_SECRET").unwrap_or_default(),
                base_url: get_env("RAZORPAY_BASE_URL").unwrap_or_else(default_razorpay_base_url),
                account_number: get_env("RAZORPAY_ACCOUNT_NUMBER").unwrap_or_default(),
                payout_mode: get_env("RAZORPAY_PAYOUT_MODE").unwrap_or_else(default_payout_mode),
            },
            fees: FeeConfig {
                gst_rate_percent: get_env_parse("GST_RATE_PERCENT", 18.0f64),
            },
            tasks: TaskConfig {
                reconcile_interval_secs: get_env_parse("RECONCILE_INTERVAL_SECS", 300u64),
            },
        })
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("RAZORPAY_KEY_ID") {
            self.razorpay.key_id = v;
        }
        if let Ok(v) = env::var("RAZORPAY_KEY_SECRET") {
            self.razorpay.key_secret = v;
        }
        if let Ok(v) = env::var("RAZORPAY_BASE_URL") {
            self.razorpay.base_url = v;
        }
        if let Ok(v) = env::var("RAZORPAY_ACCOUNT_NUMBER") {
            self.razorpay.account_number = v;
        }
        if let Ok(v) = env::var("RAZORPAY_PAYOUT_MODE") {
            self.razorpay.payout_mode = v;
        }
        if let Ok(v) = env::var("GST_RATE_PERCENT")
            && let Ok(rate) = v.parse()
        {
            self.fees.gst_rate_percent = rate;
        }
        if let Ok(v) = env::var("RECONCILE_INTERVAL_SECS")
            && let Ok(secs) = v.parse()
        {
            self.tasks.reconcile_interval_secs = secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/payouts"
            max_connections = 5

            [jwt]
            secret = "secret"
            access_token_expires_in = 3600

            [razorpay]
            key_id = "rzp_test_key"
            key_secret = "rzp_test_secret"
            account_number = "7878780080316316"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.razorpay.base_url, "https://api.razorpay.com");
        assert_eq!(config.razorpay.payout_mode, "IMPS");
        assert_eq!(config.fees.gst_rate_percent, 18.0);
        assert_eq!(config.tasks.reconcile_interval_secs, 300);
    }

    #[test]
    fn test_parse_rejects_missing_section() {
        let result = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            "#,
        );
        assert!(result.is_err());
    }
}
