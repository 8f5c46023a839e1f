//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 规则引擎配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 是否记录每个条件的评估追踪
    pub trace_enabled: bool,
    /// 启动时加载的规则文件（JSON 数组）
    pub rules_path: Option<PathBuf>,
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 服务名称，用于标识日志和指标的来源
    pub service_name: String,
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "veritas".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
        }
    }
}

impl ObservabilityConfig {
    /// 注入服务名
    pub fn with_service_name(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_string();
        self
    }

    /// 是否输出 JSON 格式日志
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub engine: EngineConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（VERITAS_ 前缀，如 VERITAS_ENGINE__TRACE_ENABLED -> engine.trace_enabled）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from_dir(service_name, config_dir)
    }

    /// 从指定目录加载配置
    pub fn load_from_dir(
        service_name: &str,
        config_dir: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let env = std::env::var("VERITAS_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            // 双下划线分隔层级，单下划线保留给字段名
            .add_source(
                Environment::with_prefix("VERITAS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 可观测性配置（已注入服务名）
    pub fn observability(&self) -> ObservabilityConfig {
        self.observability
            .clone()
            .with_service_name(&self.service_name)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(!config.engine.trace_enabled);
        assert!(config.engine.rules_path.is_none());
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_load_from_dir_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from_dir("veritas-test", dir.path()).unwrap();

        assert_eq!(config.service_name, "veritas-test");
        assert!(!config.engine.trace_enabled);
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_service_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[engine]\ntrace_enabled = false\n\n[observability]\nlog_level = \"warn\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("veritas-override.toml"),
            "[engine]\ntrace_enabled = true\nrules_path = \"rules.json\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from_dir("veritas-override", dir.path()).unwrap();

        assert!(config.engine.trace_enabled);
        assert_eq!(config.engine.rules_path, Some(PathBuf::from("rules.json")));
        assert_eq!(config.observability.log_level, "warn");
    }

    #[test]
    fn test_observability_injects_service_name() {
        let config = AppConfig {
            service_name: "veritas-sms".to_string(),
            ..Default::default()
        };
        assert_eq!(config.observability().service_name, "veritas-sms");
    }

    #[test]
    fn test_json_logs() {
        let config = ObservabilityConfig {
            log_format: "JSON".to_string(),
            ..Default::default()
        };
        assert!(config.json_logs());
        assert!(!ObservabilityConfig::default().json_logs());
    }
}
