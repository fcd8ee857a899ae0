//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MASON__*` 覆盖（双下划线表示嵌套，如 `MASON__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::loop_::{DEFAULT_MAX_COOLDOWN_MS, DEFAULT_MAX_STEPS, DEFAULT_MIN_COOLDOWN_MS};
use crate::engine::LoopOptions;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub builder: BuilderSection,
}

/// [app] 段：应用名与工程沙箱目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 工程文件沙箱根目录，未设置时用 ./workspace
    pub workspace_root: Option<PathBuf>,
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

// serde 的 default = "..." 只作用于反序列化；AppConfig::default() 也要拿到同一组缺省值
impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

/// [builder] 段：构建循环的模式、步数预算与冷却区间
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuilderSection {
    /// 提示词模式（交给提示词构造器，引擎不解释）
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_min_cooldown_ms")]
    pub min_cooldown_ms: u64,
    #[serde(default = "default_max_cooldown_ms")]
    pub max_cooldown_ms: u64,
}

fn default_mode() -> String {
    "project".to_string()
}

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

fn default_min_cooldown_ms() -> u64 {
    DEFAULT_MIN_COOLDOWN_MS
}

fn default_max_cooldown_ms() -> u64 {
    DEFAULT_MAX_COOLDOWN_MS
}

impl Default for BuilderSection {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            max_steps: default_max_steps(),
            min_cooldown_ms: default_min_cooldown_ms(),
            max_cooldown_ms: default_max_cooldown_ms(),
        }
    }
}

impl BuilderSection {
    /// 转成循环参数
    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            max_steps: self.max_steps,
            min_cooldown_ms: self.min_cooldown_ms,
            max_cooldown_ms: self.max_cooldown_ms,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            builder: BuilderSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MASON__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MASON__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MASON")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "deepseek");
        assert_eq!(cfg.llm.model, "deepseek-chat");
        assert_eq!(cfg.builder.mode, "project");
        assert_eq!(cfg.builder.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(cfg.builder.min_cooldown_ms, DEFAULT_MIN_COOLDOWN_MS);
        assert_eq!(cfg.builder.max_cooldown_ms, DEFAULT_MAX_COOLDOWN_MS);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
            [builder]
            max_steps = 3
        "#;
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.builder.max_steps, 3);
        assert_eq!(cfg.builder.min_cooldown_ms, DEFAULT_MIN_COOLDOWN_MS);
        assert_eq!(cfg.llm.provider, "deepseek");
        assert_eq!(cfg.llm.model, "deepseek-chat");
    }

    #[test]
    fn test_empty_toml_yields_usable_llm_section() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str("", config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        // [llm] 段整体缺失时也不能出现空的 provider / model
        assert_eq!(cfg.llm.provider, "deepseek");
        assert_eq!(cfg.llm.model, "deepseek-chat");
        assert_eq!(cfg.llm.base_url, None);
    }

    #[test]
    fn test_loop_options_from_builder_section() {
        let section = BuilderSection {
            mode: "project".into(),
            max_steps: 7,
            min_cooldown_ms: 100,
            max_cooldown_ms: 200,
        };
        let options = section.loop_options();
        assert_eq!(options.max_steps, 7);
        assert_eq!(options.min_cooldown_ms, 100);
        assert_eq!(options.max_cooldown_ms, 200);
    }
}
