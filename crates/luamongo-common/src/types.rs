//! 公共类型定义模块
//!
//! - Namespace: `database.collection` 形式的命名空间(带验证)
//! - DatabaseName: 数据库名称(带验证)

use crate::error::{LuaMongoError, LuaMongoResult};
use serde::{Deserialize, Serialize};

/// 数据库名称
///
/// 带验证的数据库名称,限制:
/// - 不能为空
/// - 最大 64 字符
/// - 不能包含 `.`、空格或 null 字符
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn new(name: impl Into<String>) -> LuaMongoResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(LuaMongoError::InvalidNamespace(
                "Database name cannot be empty".to_string(),
            ));
        }
        if name.len() > 64 {
            return Err(LuaMongoError::InvalidNamespace(
                "Database name cannot exceed 64 characters".to_string(),
            ));
        }
        if name.contains(['.', ' ', '\0']) {
            return Err(LuaMongoError::InvalidNamespace(format!(
                "Database name contains an invalid character: {:?}",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 命名空间
///
/// 驱动层使用的 `db.collection` 字符串。集合名允许再包含 `.`
/// (例如 `fs.chunks`)，但禁止:
/// - 空集合名
/// - 包含 null 字符
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    database: DatabaseName,
    collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> LuaMongoResult<Self> {
        let database = DatabaseName::new(database)?;
        let collection = collection.into();
        if collection.is_empty() {
            return Err(LuaMongoError::InvalidNamespace(
                "Collection name cannot be empty".to_string(),
            ));
        }
        if collection.contains('\0') {
            return Err(LuaMongoError::InvalidNamespace(
                "Collection name cannot contain null character".to_string(),
            ));
        }
        Ok(Self { database, collection })
    }

    /// 解析 `db.collection` 字符串
    pub fn parse(ns: &str) -> LuaMongoResult<Self> {
        let (db, coll) = ns.split_once('.').ok_or_else(|| {
            LuaMongoError::InvalidNamespace(format!("Expected `db.collection`, got {:?}", ns))
        })?;
        Self::new(db, coll)
    }

    pub fn database(&self) -> &str {
        self.database.as_str()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespace() {
        let ns = Namespace::parse("test.fs.chunks").unwrap();
        assert_eq!(ns.database(), "test");
        assert_eq!(ns.collection(), "fs.chunks");
        assert_eq!(ns.to_string(), "test.fs.chunks");
    }

    #[test]
    fn test_invalid_namespace() {
        assert!(Namespace::parse("nodot").is_err());
        assert!(Namespace::parse(".coll").is_err());
        assert!(Namespace::parse("db.").is_err());
        assert!(DatabaseName::new("a b").is_err());
        assert!(DatabaseName::new("x".repeat(65)).is_err());
    }
}
