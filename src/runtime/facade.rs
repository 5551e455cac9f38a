use crate::app_config::AppConfig;
use crate::backend::{PoemBackend, create_backend};
use crate::session::SessionStorage;

/// Settings the command line may override.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub backend_url: Option<String>,
}

pub struct BootstrappedRuntime {
    pub app_config: AppConfig,
    pub backend_name: String,
    pub backend: Box<dyn PoemBackend>,
    pub session: SessionStorage,
}

/// Load `.env`, the config file and env overrides, then build the backend.
pub fn bootstrap_runtime(overrides: RuntimeOverrides) -> anyhow::Result<BootstrappedRuntime> {
    let _ = dotenvy::dotenv();
    let app_config = resolve_config(AppConfig::load()?, overrides);

    let backend = create_backend(&app_config.backend)?;
    let backend_name = format!("{} ({})", backend.name(), app_config.backend.base_url);

    Ok(BootstrappedRuntime {
        app_config,
        backend_name,
        backend,
        session: SessionStorage::default(),
    })
}

fn resolve_config(mut config: AppConfig, overrides: RuntimeOverrides) -> AppConfig {
    if let Some(url) = overrides.backend_url.filter(|u| !u.trim().is_empty()) {
        config.backend.base_url = url;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BACKEND_URL;

    #[test]
    fn cli_backend_beats_config() {
        let config = resolve_config(
            AppConfig::default(),
            RuntimeOverrides {
                backend_url: Some("http://poems.local:9000".to_string()),
            },
        );
        assert_eq!(config.backend.base_url, "http://poems.local:9000");
    }

    #[test]
    fn blank_override_is_ignored() {
        let config = resolve_config(
            AppConfig::default(),
            RuntimeOverrides {
                backend_url: Some("  ".to_string()),
            },
        );
        assert_eq!(config.backend.base_url, DEFAULT_BACKEND_URL);
    }
}
