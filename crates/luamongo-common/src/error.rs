//! 错误类型定义模块
//!
//! 定义 luamongo 绑定层的统一错误类型 LuaMongoError 和 Result 别名。
//! 编解码器自身的错误见 `luamongo_codec::CodecError`，它可以无损地转换为本类型。

use thiserror::Error;

/// luamongo 错误类型
///
/// 包含绑定层所有可能的错误情况。
#[derive(Error, Debug)]
pub enum LuaMongoError {
    /// I/O 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 文档编解码错误
    #[error("{0}")]
    Codec(String),

    /// 参数无效
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 命名空间无效
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// 驱动层返回的错误
    #[error("Driver error: {0}")]
    Driver(String),

    /// 连接错误
    #[error("Connection error: {0}")]
    Connection(String),

    /// 命令执行失败
    #[error("Command failed: {0}")]
    Command(String),

    /// GridFS 错误
    #[error("GridFS error: {0}")]
    GridFs(String),
}

/// luamongo Result 类型别名
pub type LuaMongoResult<T> = Result<T, LuaMongoError>;
