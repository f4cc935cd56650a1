//! 编码器：动态值 → BSON 文档
//!
//! 顶层表总是编码为 Object；嵌套表先做环检测，再按键集合判断编码为
//! Array (键恰好为 1..N) 还是 Object。文档在完全构建后才返回，
//! 中途出错不会留下半成品。

use crate::number::{format_number, type_of};
use crate::rich::{Rich, RichValue};
use crate::spec::fits_int32;
use crate::value::{Table, TableId, TableKey, Value};
use crate::{CodecError, CodecResult};
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document, Regex, Timestamp};
use bytes::Bytes;
use luamongo_common::config::{EncoderConfig, OnUnsupported, TimestampPolicy};
use std::collections::HashSet;
use tracing::{debug, trace};

/// BSON 编码器
///
/// 每次公开调用 (`encode`、`encode_table`、`encode_value`) 都从空的已访问集合开始：
/// 同一张表在一次调用中只编码一次，第二次出现 (无论是环还是共享引用) 都会被省略。
/// 嵌套深度随递归参数传递。
pub struct Encoder<'a> {
    config: &'a EncoderConfig,
    visited: HashSet<TableId>,
}

impl<'a> Encoder<'a> {
    pub fn new(config: &'a EncoderConfig) -> Self {
        Self {
            config,
            visited: HashSet::new(),
        }
    }

    /// 编码顶层值，只接受表
    pub fn encode(&mut self, value: &Value) -> CodecResult<Document> {
        match value {
            Value::Table(table) => self.encode_table(table),
            other => Err(CodecError::ExpectedTable(type_of(other).to_string())),
        }
    }

    /// 编码顶层表
    ///
    /// # Brief
    /// 按表的迭代顺序写出所有键值对，不做数组检测
    ///
    /// # Arguments
    /// * `table` - 顶层表
    ///
    /// # Returns
    /// 构建完成的文档
    pub fn encode_table(&mut self, table: &Table) -> CodecResult<Document> {
        self.visited.clear();
        self.visited.insert(table.id());
        let doc = self.object_fields(table, 0)?;
        trace!(fields = doc.len(), "encoded document");
        Ok(doc)
    }

    /// 编码单个值，作为一次独立的顶层调用
    ///
    /// # Returns
    /// `None` 表示该字段被省略 (环、缺少载荷的包装值、跳过的宿主类型)
    pub fn encode_value(&mut self, value: &Value) -> CodecResult<Option<Bson>> {
        self.visited.clear();
        self.element(value, 0)
    }

    fn element(&mut self, value: &Value, depth: usize) -> CodecResult<Option<Bson>> {
        let bson = match value {
            Value::Nil => Bson::Null,
            Value::Boolean(b) => Bson::Boolean(*b),
            Value::Number(n) => encode_number(*n),
            Value::String(s) => Bson::String(utf8(s)?),
            Value::Table(table) => return self.encode_nested(table, depth),
            Value::Rich(rich) => return self.encode_rich(rich),
            Value::Host(kind) => match self.config.on_unsupported {
                OnUnsupported::Fail => {
                    return Err(CodecError::UnsupportedDynamicType(kind.name().to_string()))
                }
                OnUnsupported::Skip => {
                    debug!(kind = kind.name(), "skipping unsupported value");
                    return Ok(None);
                }
            },
        };
        Ok(Some(bson))
    }

    fn encode_rich(&self, rich: &Rich) -> CodecResult<Option<Bson>> {
        let value = rich.value();
        let bson = match &value {
            RichValue::Date(Some(ms)) => Some(Bson::DateTime(bson::DateTime::from_millis(*ms))),
            RichValue::Timestamp { time, increment } => match self.config.timestamp {
                TimestampPolicy::Fresh => Some(Bson::Timestamp(Timestamp { time: 0, increment: 0 })),
                TimestampPolicy::Preserve => time.map(|time| {
                    Bson::Timestamp(Timestamp {
                        time,
                        increment: increment.unwrap_or(0),
                    })
                }),
            },
            RichValue::RegEx { pattern: Some(pattern), flags: Some(flags) } => {
                Some(Bson::RegularExpression(Regex {
                    pattern: utf8(pattern)?,
                    options: utf8(flags)?,
                }))
            }
            RichValue::NumberInt(Some(n)) => Some(Bson::Int32(*n)),
            RichValue::NumberLong(Some(n)) => Some(Bson::Int64(*n)),
            RichValue::Symbol(Some(s)) => Some(Bson::Symbol(utf8(s)?)),
            RichValue::BinData(Some(bytes)) => Some(Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: bytes.to_vec(),
            })),
            RichValue::ObjectId(Some(hex)) => Some(Bson::ObjectId(
                bson::oid::ObjectId::parse_str(hex)
                    .map_err(|_| CodecError::InvalidObjectId(hex.clone()))?,
            )),
            RichValue::Null => Some(Bson::Null),
            _ => None,
        };
        if bson.is_none() {
            debug!(kind = %value.kind(), "omitting wrapper with missing payload");
        }
        Ok(bson)
    }

    fn encode_nested(&mut self, table: &Table, depth: usize) -> CodecResult<Option<Bson>> {
        if !self.visited.insert(table.id()) {
            trace!(table = ?table, "omitting already visited table");
            return Ok(None);
        }
        let bson = match dense_len(table) {
            Some(len) => Bson::Array(self.array_items(table, len, depth)?),
            None => Bson::Document(self.object_fields(table, depth)?),
        };
        Ok(Some(bson))
    }

    /// 进入下一层嵌套，返回新的深度
    fn enter(&self, depth: usize) -> CodecResult<usize> {
        if depth >= self.config.max_depth {
            return Err(CodecError::MaxDepthExceeded(self.config.max_depth));
        }
        Ok(depth + 1)
    }

    fn array_items(&mut self, table: &Table, len: usize, depth: usize) -> CodecResult<Vec<Bson>> {
        let depth = self.enter(depth)?;
        let mut items = Vec::with_capacity(len);
        for i in 1..=len {
            if let Some(bson) = self.element(&table.get(i), depth)? {
                items.push(bson);
            }
        }
        Ok(items)
    }

    fn object_fields(&mut self, table: &Table, depth: usize) -> CodecResult<Document> {
        let depth = self.enter(depth)?;
        let mut doc = Document::new();
        for (key, value) in table.entries() {
            let Some(name) = key_name(&key)? else {
                continue;
            };
            if let Some(bson) = self.element(&value, depth)? {
                doc.insert(name, bson);
            }
        }
        Ok(doc)
    }
}

/// 整数且在 Int32 范围内编码为 Int32，否则为 Double
fn encode_number(n: f64) -> Bson {
    if fits_int32(n) {
        Bson::Int32(n as i32)
    } else {
        Bson::Double(n)
    }
}

/// 键恰好为 1..N (N ≥ 1) 时返回 N
fn dense_len(table: &Table) -> Option<usize> {
    let len = table.len();
    (len > 0 && table.sequence_len() == len).then_some(len)
}

/// 表键对应的字段名；布尔键和表键没有字段名
fn key_name(key: &TableKey) -> CodecResult<Option<String>> {
    let name = match key {
        TableKey::Integer(i) => format_number(*i as f64),
        TableKey::Float(f) => format_number(f.value()),
        TableKey::String(s) => utf8(s)?,
        TableKey::Boolean(_) | TableKey::Table(_) => return Ok(None),
    };
    if name.contains('\0') {
        return Err(CodecError::InvalidFieldName(name));
    }
    Ok(Some(name))
}

fn utf8(bytes: &Bytes) -> CodecResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| CodecError::InvalidUtf8(String::from_utf8_lossy(bytes).into_owned()))
}
