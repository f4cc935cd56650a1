//! 文档参数
//!
//! 客户端方法接受三种形式的文档：JSON 字符串、动态表、或已经构建好的 BSON 文档。

use bson::Document;
use luamongo_codec::{json_to_document, Codec, Table, Value};
use luamongo_common::{LuaMongoError, LuaMongoResult};

pub const REQUIRES_JSON_OR_TABLE: &str = "JSON string or Lua table required";
pub const REQUIRES_QUERY: &str = "Query, JSON string or Lua table required";

/// 文档参数
#[derive(Debug, Clone)]
pub enum DocumentArg {
    Json(String),
    Table(Value),
    Document(Document),
}

impl DocumentArg {
    /// 从宿主传入的动态值构造：字符串按 JSON 处理，表直接编码
    pub fn from_value(value: &Value) -> LuaMongoResult<Self> {
        match value {
            Value::String(_) => value
                .as_str()
                .map(|s| DocumentArg::Json(s.to_string()))
                .ok_or_else(|| LuaMongoError::InvalidArgument("JSON string is not valid UTF-8".to_string())),
            Value::Table(_) => Ok(DocumentArg::Table(value.clone())),
            _ => Err(LuaMongoError::InvalidArgument(REQUIRES_JSON_OR_TABLE.to_string())),
        }
    }

    /// 转为 BSON 文档
    ///
    /// # Arguments
    /// * `codec` - 编码表参数时使用的编解码器
    pub fn into_document(self, codec: &Codec) -> LuaMongoResult<Document> {
        match self {
            DocumentArg::Json(text) => Ok(json_to_document(&text)?),
            DocumentArg::Table(value) => Ok(codec.encode(&value)?),
            DocumentArg::Document(doc) => Ok(doc),
        }
    }
}

impl From<&str> for DocumentArg {
    fn from(s: &str) -> Self {
        DocumentArg::Json(s.to_string())
    }
}

impl From<String> for DocumentArg {
    fn from(s: String) -> Self {
        DocumentArg::Json(s)
    }
}

impl From<Table> for DocumentArg {
    fn from(t: Table) -> Self {
        DocumentArg::Table(Value::Table(t))
    }
}

impl From<Document> for DocumentArg {
    fn from(doc: Document) -> Self {
        DocumentArg::Document(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use luamongo_codec::{table, HostKind};

    #[test]
    fn test_json_argument() {
        let doc = DocumentArg::from(r#"{"a": 1}"#).into_document(&Codec::default()).unwrap();
        assert_eq!(doc, doc! { "a": 1i32 });
    }

    #[test]
    fn test_table_argument() {
        let arg = DocumentArg::from(table! { "a" => 1.5 });
        assert_eq!(arg.into_document(&Codec::default()).unwrap(), doc! { "a": 1.5 });
    }

    #[test]
    fn test_from_value() {
        assert!(matches!(DocumentArg::from_value(&Value::from("{}")), Ok(DocumentArg::Json(_))));
        assert!(matches!(
            DocumentArg::from_value(&Value::Table(Table::new())),
            Ok(DocumentArg::Table(_))
        ));

        let err = DocumentArg::from_value(&Value::from(5)).unwrap_err();
        assert_eq!(err.to_string(), format!("Invalid argument: {}", REQUIRES_JSON_OR_TABLE));
        assert!(DocumentArg::from_value(&Value::Host(HostKind::Function)).is_err());
    }

    #[test]
    fn test_codec_error_surfaces() {
        let arg = DocumentArg::from(table! { "f" => Value::Host(HostKind::Function) });
        let err = arg.into_document(&Codec::default()).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported Lua type `function'");

        let err = DocumentArg::from("{broken").into_document(&Codec::default()).unwrap_err();
        assert!(matches!(err, LuaMongoError::Codec(_)));
    }
}
