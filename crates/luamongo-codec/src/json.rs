//! JSON 桥接
//!
//! 宿主传入的 JSON 字符串经 `serde_json` 解析后，按 MongoDB Extended JSON
//! 规则转为 BSON 文档 (`{"$oid": ..}`、`{"$date": ..}` 等会还原为对应类型)。

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::value::Value;
use crate::{CodecError, CodecResult};
use bson::{Bson, Document};
use luamongo_common::config::{DecoderConfig, EncoderConfig};
use serde_json::Value as JsonValue;

/// Extended JSON 输出模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonMode {
    /// 数字、日期尽量用原生 JSON 表示
    #[default]
    Relaxed,
    /// 所有类型都带 `$` 包装，可无损还原
    Canonical,
}

/// 解析 JSON 文本为 BSON 文档
///
/// # Arguments
/// * `text` - JSON 文本，顶层必须是对象
///
/// # Returns
/// 解析得到的文档；语法错误或顶层不是对象时返回 `Json` 错误
pub fn json_to_document(text: &str) -> CodecResult<Document> {
    let json: JsonValue =
        serde_json::from_str(text).map_err(|e| CodecError::Json(e.to_string()))?;
    let JsonValue::Object(map) = json else {
        return Err(CodecError::Json("top-level JSON value must be an object".to_string()));
    };
    Document::try_from(map).map_err(|e| CodecError::Json(e.to_string()))
}

/// 文档转为 Extended JSON 文本
pub fn document_to_json(doc: &Document, mode: JsonMode) -> String {
    let bson = Bson::Document(doc.clone());
    match mode {
        JsonMode::Relaxed => bson.into_relaxed_extjson().to_string(),
        JsonMode::Canonical => bson.into_canonical_extjson().to_string(),
    }
}

/// JSON 文本 → 动态值
pub fn json_to_value(text: &str, config: &DecoderConfig) -> CodecResult<Value> {
    let doc = json_to_document(text)?;
    Decoder::new(config).decode_document(&doc)
}

/// 动态值 → JSON 文本
pub fn value_to_json(value: &Value, config: &EncoderConfig, mode: JsonMode) -> CodecResult<String> {
    let doc = Encoder::new(config).encode(value)?;
    Ok(document_to_json(&doc, mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rich::{RichKind, RichValue};
    use crate::table;
    use bson::doc;

    #[test]
    fn test_json_to_document() {
        let doc = json_to_document(r#"{"name": "x", "n": 5, "f": 1.5, "list": [1, 2]}"#).unwrap();
        assert_eq!(doc, doc! { "name": "x", "n": 5i32, "f": 1.5, "list": [1i32, 2i32] });
    }

    #[test]
    fn test_extended_json_types() {
        let doc = json_to_document(
            r#"{"_id": {"$oid": "507f1f77bcf86cd799439011"}, "big": {"$numberLong": "9007199254740993"}}"#,
        )
        .unwrap();
        assert_eq!(doc.get_object_id("_id").unwrap().to_hex(), "507f1f77bcf86cd799439011");
        assert_eq!(doc.get_i64("big").unwrap(), 9_007_199_254_740_993);
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(json_to_document("{not json"), Err(CodecError::Json(_))));
        assert!(matches!(json_to_document("[1, 2]"), Err(CodecError::Json(_))));
    }

    #[test]
    fn test_json_to_value() {
        let value = json_to_value(r#"{"a": {"$oid": "507f1f77bcf86cd799439011"}}"#, &DecoderConfig::default())
            .unwrap();
        let a = value.as_table().unwrap().get("a");
        assert_eq!(a.as_rich().unwrap().kind(), RichKind::ObjectId);

        assert_eq!(json_to_value("{}", &DecoderConfig::default()).unwrap(), Value::Nil);
    }

    #[test]
    fn test_document_to_json_modes() {
        let doc = doc! { "n": 5i32 };
        assert_eq!(document_to_json(&doc, JsonMode::Relaxed), r#"{"n":5}"#);
        assert_eq!(document_to_json(&doc, JsonMode::Canonical), r#"{"n":{"$numberInt":"5"}}"#);
    }

    #[test]
    fn test_value_to_json() {
        let t = table! { "when" => RichValue::Date(Some(0)), "ok" => true };
        let text = value_to_json(&t.into(), &EncoderConfig::default(), JsonMode::Canonical).unwrap();
        assert_eq!(text, r#"{"when":{"$date":{"$numberLong":"0"}},"ok":true}"#);
    }
}
