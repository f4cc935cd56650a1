pub mod error;
pub mod types;
pub mod config;
pub mod logging;

pub use error::{LuaMongoError, LuaMongoResult};
pub use types::*;

/// 扩展类型注册所在的宿主根表名
pub const ROOT_NAMESPACE: &str = "mongo";
