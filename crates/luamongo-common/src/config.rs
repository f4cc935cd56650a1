//! 配置模块
//!
//! 本模块定义了 luamongo 绑定层的所有配置选项:
//! - 编码器配置(不支持类型的处理策略、Timestamp 策略、最大嵌套深度)
//! - 解码器配置(Int64 映射方式、最大嵌套深度)
//! - 客户端配置(GridFS 分块大小、前缀、游标批量大小)
//! - 日志配置
//!
//! 支持从 TOML 文件加载配置。

use crate::error::{LuaMongoError, LuaMongoResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// GridFS 默认分块大小 (256 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// GridFS 分块大小上限，即单个 BSON 文档的最大长度 (16 MiB)
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// 编码器遇到无法表示的动态值类型时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnUnsupported {
    /// 中止整个编码调用
    #[default]
    Fail,
    /// 跳过该字段
    Skip,
}

/// Int64 元素解码为动态值的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Int64Mode {
    /// 转换为宿主浮点数 (超过 2^53 时丢失精度)
    #[default]
    Number,
    /// 包装为 NumberLong，保留全部 64 位
    NumberLong,
}

/// 编码 Timestamp 包装值时的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// 忽略载荷，写入由服务器填充的空时间戳
    #[default]
    Fresh,
    /// 按载荷原样写入
    Preserve,
}

/// 编码器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default)]
    pub on_unsupported: OnUnsupported,

    #[serde(default)]
    pub timestamp: TimestampPolicy,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            on_unsupported: OnUnsupported::default(),
            timestamp: TimestampPolicy::default(),
            max_depth: default_max_depth(),
        }
    }
}

/// 解码器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub int64: Int64Mode,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            int64: Int64Mode::default(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize { DEFAULT_MAX_DEPTH }

/// 编解码器配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// GridFS 分块大小(字节)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// GridFS 集合前缀 (默认: fs)
    #[serde(default = "default_gridfs_prefix")]
    pub gridfs_prefix: String,

    /// 游标每批返回的文档数, 0 表示由驱动决定
    #[serde(default)]
    pub batch_size: u32,
}

fn default_chunk_size() -> usize { DEFAULT_CHUNK_SIZE }
fn default_gridfs_prefix() -> String { "fs".to_string() }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            gridfs_prefix: default_gridfs_prefix(),
            batch_size: 0,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// luamongo 主配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuaMongoConfig {
    #[serde(default)]
    pub codec: CodecConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl LuaMongoConfig {
    /// # Brief
    /// 从 TOML 字符串解析配置
    ///
    /// # Arguments
    /// * `content` - TOML 文本
    ///
    /// # Returns
    /// 解析并校验后的配置实例
    pub fn from_toml_str(content: &str) -> LuaMongoResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| LuaMongoError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// # Brief
    /// 从 TOML 文件加载配置
    ///
    /// # Arguments
    /// * `path` - 配置文件路径
    ///
    /// # Returns
    /// 解析后的配置实例
    pub fn from_file(path: &Path) -> LuaMongoResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| LuaMongoError::Config(format!("Failed to read config: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// # Brief
    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> LuaMongoResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LuaMongoError::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> LuaMongoResult<()> {
        if self.codec.encoder.max_depth == 0 || self.codec.decoder.max_depth == 0 {
            return Err(LuaMongoError::Config("max_depth must be positive".to_string()));
        }
        if self.client.chunk_size == 0 {
            return Err(LuaMongoError::Config("chunk_size must be positive".to_string()));
        }
        if self.client.chunk_size > MAX_CHUNK_SIZE {
            return Err(LuaMongoError::Config(format!(
                "chunk_size must not exceed {} bytes",
                MAX_CHUNK_SIZE
            )));
        }
        if self.client.gridfs_prefix.is_empty() {
            return Err(LuaMongoError::Config("gridfs_prefix cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LuaMongoConfig::default();
        assert_eq!(config.codec.encoder.on_unsupported, OnUnsupported::Fail);
        assert_eq!(config.codec.encoder.timestamp, TimestampPolicy::Fresh);
        assert_eq!(config.codec.decoder.int64, Int64Mode::Number);
        assert_eq!(config.codec.decoder.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.client.chunk_size, 256 * 1024);
        assert_eq!(config.client.gridfs_prefix, "fs");
    }

    #[test]
    fn test_partial_toml() {
        let config = LuaMongoConfig::from_toml_str(
            r#"
            [codec.encoder]
            on_unsupported = "skip"

            [codec.decoder]
            int64 = "number_long"
            max_depth = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.codec.encoder.on_unsupported, OnUnsupported::Skip);
        assert_eq!(config.codec.encoder.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.codec.decoder.int64, Int64Mode::NumberLong);
        assert_eq!(config.codec.decoder.max_depth, 16);
        assert_eq!(config.client, ClientConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        assert!(LuaMongoConfig::from_toml_str("[client]\nchunk_size = 0\n").is_err());
        assert!(LuaMongoConfig::from_toml_str("[client]\nchunk_size = 16777217\n").is_err());
        assert!(LuaMongoConfig::from_toml_str("[client]\nchunk_size = 16777216\n").is_ok());
        assert!(LuaMongoConfig::from_toml_str("[codec.encoder]\non_unsupported = \"ignore\"\n").is_err());
    }

    #[test]
    fn test_from_file_round_trip() {
        let mut config = LuaMongoConfig::default();
        config.codec.encoder.timestamp = TimestampPolicy::Preserve;
        config.client.chunk_size = 1024;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

        let loaded = LuaMongoConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }
}
