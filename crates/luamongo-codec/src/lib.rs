//! # luamongo-codec
//!
//! 宿主脚本的动态值与 BSON 文档之间的转换引擎。
//!
//! - **解码**：BSON 文档 → 动态值，无宿主对应物的类型变为扩展类型包装值
//! - **编码**：动态值 → BSON 文档，带环检测、稠密数组识别和数值类型推断
//! - **扩展类型**：Date、Timestamp、RegEx、NumberInt、NumberLong、Symbol、
//!   BinData、ObjectId、Null 的构造、调用和显示
//!
//! ## 快速开始
//!
//! ```rust,ignore
//! use luamongo_codec::{table, decode, encode, Value};
//!
//! let t = table! { "name" => "luamongo", "tags" => luamongo_codec::Table::from_sequence(["a", "b"]) };
//! let doc = encode(&Value::Table(t)).unwrap();
//! let back = decode(&doc).unwrap();
//! ```

pub mod decode;
pub mod encode;
pub mod json;
pub mod number;
pub mod rich;
pub mod spec;
pub mod value;

pub use decode::Decoder;
pub use encode::Encoder;
pub use json::{document_to_json, json_to_document, json_to_value, value_to_json, JsonMode};
pub use number::{format_number, to_number, type_of};
pub use rich::{construct, construct_by_name, Rich, RichKind, RichValue};
pub use value::{HostKind, Table, TableId, TableKey, Value};

use bson::{Bson, Document};
use luamongo_common::config::CodecConfig;
use luamongo_common::LuaMongoError;
use thiserror::Error;

/// 编解码错误
#[derive(Error, Debug)]
pub enum CodecError {
    /// 文档中出现无法映射为动态值的 BSON 类型
    #[error("Unsupported BSON type `{0}'")]
    UnsupportedDocumentType(String),

    /// 动态值中出现无法编码的宿主类型
    #[error("Unsupported Lua type `{0}'")]
    UnsupportedDynamicType(String),

    /// 嵌套层级过深
    #[error("Nesting too deep: max {0}")]
    MaxDepthExceeded(usize),

    /// 顶层编码的参数不是表
    #[error("table expected, got {0}")]
    ExpectedTable(String),

    /// 字符串不是有效的 UTF-8 编码
    #[error("Invalid UTF-8: {0:?}")]
    InvalidUtf8(String),

    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    /// ObjectId 载荷不是 24 位十六进制
    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(String),

    /// 扩展类型构造参数错误
    #[error("bad argument #{position} to '{function}' ({message})")]
    BadArgument {
        function: &'static str,
        position: usize,
        message: String,
    },

    #[error("Unknown type: {0}")]
    UnknownRichType(String),

    /// JSON 文本无法解析或转换
    #[error("JSON error: {0}")]
    Json(String),

    /// BSON 字节格式无效
    #[error("Malformed BSON: {0}")]
    Malformed(String),

    /// 文档写出为字节时出错
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// 编解码操作的 Result 类型别名
pub type CodecResult<T> = Result<T, CodecError>;

impl From<CodecError> for LuaMongoError {
    fn from(e: CodecError) -> Self {
        LuaMongoError::Codec(e.to_string())
    }
}

/// 绑定一份配置的编解码器
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// 动态值 → 文档
    pub fn encode(&self, value: &Value) -> CodecResult<Document> {
        Encoder::new(&self.config.encoder).encode(value)
    }

    /// 动态值 → BSON 字节
    pub fn encode_to_vec(&self, value: &Value) -> CodecResult<Vec<u8>> {
        let doc = self.encode(value)?;
        let mut buf = Vec::new();
        doc.to_writer(&mut buf)
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// 文档 → 动态值，空文档得到 Nil
    pub fn decode(&self, doc: &Document) -> CodecResult<Value> {
        Decoder::new(&self.config.decoder).decode_document(doc)
    }

    pub fn decode_bytes(&self, bytes: &[u8]) -> CodecResult<Value> {
        Decoder::new(&self.config.decoder).decode_bytes(bytes)
    }

    /// 单个 BSON 元素 → 动态值
    pub fn decode_element(&self, element: &Bson) -> CodecResult<Value> {
        Decoder::new(&self.config.decoder).decode_element(element)
    }

    /// JSON 文本 → 动态值
    pub fn decode_json(&self, text: &str) -> CodecResult<Value> {
        json_to_value(text, &self.config.decoder)
    }

    /// 动态值 → Extended JSON 文本
    pub fn encode_json(&self, value: &Value, mode: JsonMode) -> CodecResult<String> {
        value_to_json(value, &self.config.encoder, mode)
    }
}

/// 使用默认配置编码
pub fn encode(value: &Value) -> CodecResult<Document> {
    Codec::default().encode(value)
}

/// 使用默认配置解码
pub fn decode(doc: &Document) -> CodecResult<Value> {
    Codec::default().decode(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table;
    use luamongo_common::config::{DecoderConfig, EncoderConfig, Int64Mode, TimestampPolicy};
    use proptest::prelude::*;

    /// 把值放进单字段表，编码再解码，取回该字段
    fn round_trip_with(codec: &Codec, value: Value) -> Value {
        let doc = codec.encode(&table! { "v" => value }.into()).unwrap();
        let back = codec.decode(&doc).unwrap();
        back.as_table().map(|t| t.get("v")).unwrap_or(Value::Nil)
    }

    fn round_trip(value: Value) -> Value {
        round_trip_with(&Codec::default(), value)
    }

    fn lossless() -> Codec {
        Codec::new(CodecConfig {
            encoder: EncoderConfig { timestamp: TimestampPolicy::Preserve, ..EncoderConfig::default() },
            decoder: DecoderConfig { int64: Int64Mode::NumberLong, ..DecoderConfig::default() },
        })
    }

    proptest! {
        #[test]
        fn prop_bool_round_trip(b in any::<bool>()) {
            prop_assert_eq!(round_trip(Value::Boolean(b)), Value::Boolean(b));
        }

        #[test]
        fn prop_int32_round_trip(n in any::<i32>()) {
            prop_assert_eq!(round_trip(Value::from(n)), Value::from(n));
        }

        #[test]
        fn prop_fraction_round_trip(n in -1.0e12f64..1.0e12f64) {
            prop_assume!(n.fract() != 0.0);
            prop_assert_eq!(round_trip(Value::Number(n)), Value::Number(n));
        }

        #[test]
        fn prop_string_round_trip(s in "[^\u{0}]{0,64}") {
            prop_assert_eq!(round_trip(Value::from(s.as_str())), Value::from(s.as_str()));
        }

        #[test]
        fn prop_bindata_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
            let back = round_trip(Value::from(RichValue::BinData(Some(bytes.clone().into()))));
            prop_assert_eq!(back.as_rich().map(|r| r.value()), Some(RichValue::BinData(Some(bytes.into()))));
        }
    }

    #[test]
    fn test_rich_round_trips() {
        let cases = [
            RichValue::Date(Some(1_700_000_000_000)),
            RichValue::RegEx { pattern: Some("^a+$".into()), flags: Some("i".into()) },
            RichValue::Symbol(Some("sym".into())),
            RichValue::BinData(Some(bytes::Bytes::from_static(b"\x00\x01\xFF"))),
            RichValue::ObjectId(Some("507f1f77bcf86cd799439011".to_string())),
            RichValue::Null,
        ];
        for case in cases {
            let back = round_trip(Value::from(case.clone()));
            assert_eq!(back.as_rich().map(|r| r.value()), Some(case));
        }
    }

    #[test]
    fn test_number_int_round_trip() {
        let v = Value::from(RichValue::NumberInt(Some(42)));
        let back = round_trip(v);
        assert_eq!(back, Value::Number(42.0));
        let doc = encode(&table! { "v" => back }.into()).unwrap();
        assert_eq!(doc.get("v"), Some(&bson::Bson::Int32(42)));
    }

    #[test]
    fn test_number_long_round_trip() {
        let v = Value::from(RichValue::NumberLong(Some(9_007_199_254_740_993)));

        // 默认配置按宿主数字解码，精度有损
        assert_eq!(round_trip(v.clone()), Value::Number(9_007_199_254_740_992.0));

        let back = round_trip_with(&lossless(), v);
        assert_eq!(
            back.as_rich().map(|r| r.value()),
            Some(RichValue::NumberLong(Some(9_007_199_254_740_993)))
        );
    }

    #[test]
    fn test_timestamp_preserve_round_trip() {
        let ts = RichValue::Timestamp { time: Some(1_700_000_000), increment: Some(9) };
        let back = round_trip_with(&lossless(), Value::from(ts.clone()));
        assert_eq!(back.as_rich().map(|r| r.value()), Some(ts.clone()));

        // 读出槽位再写回，编码结果不变
        let rich = back.as_rich().unwrap();
        rich.call(&rich.get()).unwrap();
        let again = round_trip_with(&lossless(), back.clone());
        assert_eq!(again.as_rich().map(|r| r.value()), Some(ts));
    }

    #[test]
    fn test_empty_document_asymmetry() {
        let doc = encode(&Table::new().into()).unwrap();
        assert!(doc.is_empty());
        assert_eq!(decode(&doc).unwrap(), Value::Nil);
    }

    #[test]
    fn test_nested_structure_round_trip() {
        let t = table! {
            "name" => "doc",
            "list" => Table::from_sequence([1, 2, 3]),
            "inner" => table! { "x" => 1.5 },
        };
        let back = decode(&encode(&t.into()).unwrap()).unwrap();
        let back = back.as_table().unwrap();
        assert_eq!(back.get("name"), Value::from("doc"));
        assert_eq!(back.get("list").as_table().unwrap().sequence_len(), 3);
        assert_eq!(back.get("inner").as_table().unwrap().get("x"), Value::Number(1.5));
    }

    #[test]
    fn test_bytes_round_trip() {
        let codec = Codec::default();
        let bytes = codec.encode_to_vec(&table! { "a" => "b" }.into()).unwrap();
        let back = codec.decode_bytes(&bytes).unwrap();
        assert_eq!(back.as_table().unwrap().get("a"), Value::from("b"));
    }

    #[test]
    fn test_decode_element() {
        let codec = Codec::default();
        assert_eq!(codec.decode_element(&Bson::Int32(3)).unwrap(), Value::Number(3.0));
        assert_eq!(codec.decode_element(&Bson::Undefined).unwrap(), Value::Nil);
        assert!(codec.decode_element(&Bson::MaxKey).is_err());
    }

    #[test]
    fn test_error_conversion() {
        let err: LuaMongoError = CodecError::UnsupportedDocumentType("Code".to_string()).into();
        assert_eq!(err.to_string(), "Unsupported BSON type `Code'");
    }
}
