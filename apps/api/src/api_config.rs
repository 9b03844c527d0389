use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use jit_cleaner_core::AppError;
use jit_cleaner_infrastructure::{DEFAULT_PUBSUB_BASE_URL, DEFAULT_RESOURCE_MANAGER_BASE_URL};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub project_id: String,
    pub topic_path: String,
    pub subscription_path: String,
    pub batch_size: usize,
    pub api_host: String,
    pub api_port: u16,
    pub pubsub_base_url: Url,
    pub resource_manager_base_url: Url,
    pub static_access_token: Option<String>,
    pub http_timeout_seconds: u64,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_id = required_non_empty(&lookup, "PROJECT_ID")?;
        let topic_name = required_non_empty(&lookup, "PUBSUB_TOPIC_NAME")?;
        let subscription_path = required_non_empty(&lookup, "PUBSUB_SUBSCRIPTION_PATH")?;
        if !subscription_path.starts_with("projects/")
            || !subscription_path.contains("/subscriptions/")
        {
            return Err(AppError::Validation(format!(
                "PUBSUB_SUBSCRIPTION_PATH must look like 'projects/<project>/subscriptions/<name>', got '{subscription_path}'"
            )));
        }

        let batch_size = required_non_empty(&lookup, "NUM_MESSAGES")?
            .parse::<usize>()
            .map_err(|error| AppError::Validation(format!("invalid NUM_MESSAGES: {error}")))?;
        if batch_size == 0 {
            return Err(AppError::Validation(
                "NUM_MESSAGES must be greater than zero".to_owned(),
            ));
        }

        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let api_port = match lookup("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid PORT: {error}")))?,
            None => 8080,
        };

        let pubsub_base_url = parse_url(
            "PUBSUB_API_BASE_URL",
            lookup("PUBSUB_API_BASE_URL").as_deref(),
            DEFAULT_PUBSUB_BASE_URL,
        )?;
        let resource_manager_base_url = parse_url(
            "RESOURCE_MANAGER_API_BASE_URL",
            lookup("RESOURCE_MANAGER_API_BASE_URL").as_deref(),
            DEFAULT_RESOURCE_MANAGER_BASE_URL,
        )?;

        let static_access_token = lookup("GOOGLE_OAUTH_ACCESS_TOKEN")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let http_timeout_seconds = match lookup("HTTP_TIMEOUT_SECONDS") {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid HTTP_TIMEOUT_SECONDS: {error}"))
            })?,
            None => 30,
        };
        if http_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            topic_path: topic_path(project_id.as_str(), topic_name.as_str()),
            project_id,
            subscription_path,
            batch_size,
            api_host,
            api_port,
            pubsub_base_url,
            resource_manager_base_url,
            static_access_token,
            http_timeout_seconds,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn topic_path(project_id: &str, topic_name: &str) -> String {
    if topic_name.starts_with("projects/") {
        return topic_name.to_owned();
    }

    format!("projects/{project_id}/topics/{topic_name}")
}

fn required_non_empty<F>(lookup: &F, name: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value.trim().to_owned())
}

fn parse_url(name: &str, value: Option<&str>, default: &str) -> Result<Url, AppError> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default);

    let url = Url::parse(value)
        .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "{name} must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use jit_cleaner_core::AppError;

    use super::ApiConfig;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("PROJECT_ID", "acme-ops"),
            ("PUBSUB_TOPIC_NAME", "jit-access"),
            (
                "PUBSUB_SUBSCRIPTION_PATH",
                "projects/acme-ops/subscriptions/jit-cleaner",
            ),
            ("NUM_MESSAGES", "10"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<ApiConfig, AppError> {
        ApiConfig::from_lookup(|name| env.get(name).map(|value| (*value).to_owned()))
    }

    #[test]
    fn loads_required_settings_with_defaults() {
        let config = load(&base_env());
        let Ok(config) = config else {
            panic!("config should load: {config:?}");
        };

        assert_eq!(config.topic_path, "projects/acme-ops/topics/jit-access");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.api_port, 8080);
        assert_eq!(
            config.pubsub_base_url.as_str(),
            "https://pubsub.googleapis.com/"
        );
        assert!(config.static_access_token.is_none());
        assert!(config.socket_address().is_ok());
    }

    #[test]
    fn full_topic_path_is_kept() {
        let mut env = base_env();
        env.insert("PUBSUB_TOPIC_NAME", "projects/shared/topics/jit");

        let config = load(&env);
        assert_eq!(
            config.map(|config| config.topic_path).ok().as_deref(),
            Some("projects/shared/topics/jit")
        );
    }

    #[test]
    fn every_required_setting_is_enforced() {
        for name in [
            "PROJECT_ID",
            "PUBSUB_TOPIC_NAME",
            "PUBSUB_SUBSCRIPTION_PATH",
            "NUM_MESSAGES",
        ] {
            let mut env = base_env();
            env.remove(name);
            assert!(
                matches!(load(&env), Err(AppError::Validation(_))),
                "{name} should be required"
            );
        }
    }

    #[test]
    fn batch_size_must_be_positive_integer() {
        for value in ["0", "-1", "ten"] {
            let mut env = base_env();
            env.insert("NUM_MESSAGES", value);
            assert!(matches!(load(&env), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn subscription_path_must_be_fully_qualified() {
        let mut env = base_env();
        env.insert("PUBSUB_SUBSCRIPTION_PATH", "jit-cleaner");
        assert!(matches!(load(&env), Err(AppError::Validation(_))));
    }

    #[test]
    fn base_url_overrides_are_validated() {
        let mut env = base_env();
        env.insert("PUBSUB_API_BASE_URL", "ftp://emulator:8085");
        assert!(matches!(load(&env), Err(AppError::Validation(_))));

        env.insert("PUBSUB_API_BASE_URL", "http://localhost:8085");
        assert_eq!(
            load(&env)
                .map(|config| config.pubsub_base_url.to_string())
                .ok()
                .as_deref(),
            Some("http://localhost:8085/")
        );
    }
}
