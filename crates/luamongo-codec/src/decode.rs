//! 解码器：BSON 文档 → 动态值
//!
//! 深度优先遍历文档，按元素类型分派：
//! - 标量直接映射为 Number / Boolean / String / Nil
//! - Array 映射为键 1..N 的表，Object 映射为以字段名为键的表
//! - 没有宿主对应物的类型映射为扩展类型包装值
//!
//! 文档结束标记由 `bson` 的迭代器消化，不产生值。

use crate::rich::RichValue;
use crate::spec::element_type_name;
use crate::value::{Table, Value};
use crate::{CodecError, CodecResult};
use bson::{Bson, Document};
use bytes::Bytes;
use luamongo_common::config::{DecoderConfig, Int64Mode};
use tracing::{debug, trace};

/// BSON 解码器
///
/// 只持有配置；嵌套深度随递归参数传递，出错后仍可重复使用。
pub struct Decoder<'a> {
    config: &'a DecoderConfig,
}

impl<'a> Decoder<'a> {
    pub fn new(config: &'a DecoderConfig) -> Self {
        Self { config }
    }

    /// 解码整个文档
    ///
    /// # Brief
    /// 空文档返回 Nil，以便调用方用真值区分“无结果”和有内容的结果
    ///
    /// # Arguments
    /// * `doc` - 要解码的文档
    ///
    /// # Returns
    /// Nil 或新建的表
    pub fn decode_document(&self, doc: &Document) -> CodecResult<Value> {
        if doc.is_empty() {
            return Ok(Value::Nil);
        }
        trace!(fields = doc.len(), "decoding document");
        Ok(Value::Table(self.document_to_table(doc, 0)?))
    }

    /// 解码 BSON 字节
    pub fn decode_bytes(&self, bytes: &[u8]) -> CodecResult<Value> {
        let doc = Document::from_reader(&mut &bytes[..])
            .map_err(|e| CodecError::Malformed(e.to_string()))?;
        self.decode_document(&doc)
    }

    /// 解码单个元素，嵌套深度从 0 开始计算
    pub fn decode_element(&self, element: &Bson) -> CodecResult<Value> {
        self.element(element, 0)
    }

    fn element(&self, element: &Bson, depth: usize) -> CodecResult<Value> {
        let value = match element {
            Bson::Undefined => Value::Nil,
            Bson::Null => Value::from(RichValue::Null),
            Bson::Int32(n) => Value::Number(f64::from(*n)),
            Bson::Int64(n) => match self.config.int64 {
                Int64Mode::Number => Value::Number(*n as f64),
                Int64Mode::NumberLong => Value::from(RichValue::NumberLong(Some(*n))),
            },
            Bson::Double(n) => Value::Number(*n),
            Bson::Boolean(b) => Value::Boolean(*b),
            Bson::String(s) => Value::String(Bytes::copy_from_slice(s.as_bytes())),
            Bson::Array(items) => Value::Table(self.array_to_table(items, depth)?),
            Bson::Document(doc) => Value::Table(self.document_to_table(doc, depth)?),
            Bson::DateTime(dt) => Value::from(RichValue::Date(Some(dt.timestamp_millis()))),
            Bson::Timestamp(ts) => Value::from(RichValue::Timestamp {
                time: Some(ts.time),
                increment: Some(ts.increment),
            }),
            Bson::Symbol(s) => Value::from(RichValue::Symbol(Some(Bytes::copy_from_slice(s.as_bytes())))),
            Bson::Binary(bin) => Value::from(RichValue::BinData(Some(Bytes::copy_from_slice(&bin.bytes)))),
            Bson::RegularExpression(regex) => Value::from(RichValue::RegEx {
                pattern: Some(Bytes::copy_from_slice(regex.pattern.as_bytes())),
                flags: Some(Bytes::copy_from_slice(regex.options.as_bytes())),
            }),
            Bson::ObjectId(oid) => Value::from(RichValue::ObjectId(Some(oid.to_hex()))),
            other => {
                let name = element_type_name(other.element_type());
                debug!(element_type = name, "unsupported BSON element");
                return Err(CodecError::UnsupportedDocumentType(name.to_string()));
            }
        };
        Ok(value)
    }

    /// 进入下一层嵌套，返回新的深度
    fn enter(&self, depth: usize) -> CodecResult<usize> {
        if depth >= self.config.max_depth {
            return Err(CodecError::MaxDepthExceeded(self.config.max_depth));
        }
        Ok(depth + 1)
    }

    fn document_to_table(&self, doc: &Document, depth: usize) -> CodecResult<Table> {
        let depth = self.enter(depth)?;
        let table = Table::new();
        for (name, element) in doc {
            let value = self.element(element, depth)?;
            table.set(name.as_str(), value);
        }
        Ok(table)
    }

    fn array_to_table(&self, items: &[Bson], depth: usize) -> CodecResult<Table> {
        let depth = self.enter(depth)?;
        let table = Table::new();
        for (i, element) in items.iter().enumerate() {
            let value = self.element(element, depth)?;
            table.set(i as i64 + 1, value);
        }
        Ok(table)
    }
}
