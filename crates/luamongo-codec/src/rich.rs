//! 扩展类型注册表
//!
//! BSON 中没有动态值对应物的类型 (Date、RegEx、NumberLong、ObjectId 等)
//! 在宿主侧表示为“扩展类型包装值”。类型由封闭枚举 [`RichKind`] 区分，
//! 不占用表中的任何用户键。
//!
//! 每个类型提供三种行为：
//! - 构造：`construct(kind, args)`，在调用边界校验参数
//! - 调用：`Rich::call(args)`，无参数时读取载荷，有参数时原地替换载荷
//! - 显示：`Rich::to_display_string()`

use crate::number::{format_number, to_number};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use luamongo_common::ROOT_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// 扩展类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RichKind {
    Date,
    Timestamp,
    RegEx,
    NumberInt,
    NumberLong,
    Symbol,
    BinData,
    ObjectId,
    Null,
}

impl RichKind {
    pub const ALL: [RichKind; 9] = [
        RichKind::Date,
        RichKind::Timestamp,
        RichKind::RegEx,
        RichKind::NumberInt,
        RichKind::NumberLong,
        RichKind::Symbol,
        RichKind::BinData,
        RichKind::ObjectId,
        RichKind::Null,
    ];

    /// 构造函数名，也是宿主侧注册的名字
    pub fn name(self) -> &'static str {
        match self {
            RichKind::Date => "Date",
            RichKind::Timestamp => "Timestamp",
            RichKind::RegEx => "RegEx",
            RichKind::NumberInt => "NumberInt",
            RichKind::NumberLong => "NumberLong",
            RichKind::Symbol => "Symbol",
            RichKind::BinData => "BinData",
            RichKind::ObjectId => "ObjectId",
            RichKind::Null => "Null",
        }
    }

    /// 带命名空间的类型名，例如 `mongo.Date`
    pub fn qualified_name(self) -> &'static str {
        match self {
            RichKind::Date => "mongo.Date",
            RichKind::Timestamp => "mongo.Timestamp",
            RichKind::RegEx => "mongo.RegEx",
            RichKind::NumberInt => "mongo.NumberInt",
            RichKind::NumberLong => "mongo.NumberLong",
            RichKind::Symbol => "mongo.Symbol",
            RichKind::BinData => "mongo.BinData",
            RichKind::ObjectId => "mongo.ObjectId",
            RichKind::Null => "mongo.Null",
        }
    }

    /// 按名字查找，接受 `Date` 或 `mongo.Date`
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name
            .strip_prefix(ROOT_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        Self::ALL.into_iter().find(|kind| kind.name() == short)
    }
}

impl fmt::Display for RichKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 扩展类型的载荷
///
/// 每个载荷槽都是可选的：宿主代码可以构造缺少参数的包装值，
/// 编码器会跳过这类字段而不是报错。
#[derive(Debug, Clone, PartialEq)]
pub enum RichValue {
    /// 自 Unix 纪元起的毫秒数
    Date(Option<i64>),
    /// 秒级时间和同一秒内的序号，分两个槽保存以保持精确
    Timestamp {
        time: Option<u32>,
        increment: Option<u32>,
    },
    RegEx {
        pattern: Option<Bytes>,
        flags: Option<Bytes>,
    },
    NumberInt(Option<i32>),
    NumberLong(Option<i64>),
    Symbol(Option<Bytes>),
    BinData(Option<Bytes>),
    /// 24 位十六进制字符串
    ObjectId(Option<String>),
    Null,
}

impl RichValue {
    pub fn kind(&self) -> RichKind {
        match self {
            RichValue::Date(_) => RichKind::Date,
            RichValue::Timestamp { .. } => RichKind::Timestamp,
            RichValue::RegEx { .. } => RichKind::RegEx,
            RichValue::NumberInt(_) => RichKind::NumberInt,
            RichValue::NumberLong(_) => RichKind::NumberLong,
            RichValue::Symbol(_) => RichKind::Symbol,
            RichValue::BinData(_) => RichKind::BinData,
            RichValue::ObjectId(_) => RichKind::ObjectId,
            RichValue::Null => RichKind::Null,
        }
    }

    /// 载荷槽 1 (和 2) 对应的动态值
    pub fn slots(&self) -> Vec<Value> {
        fn bytes(slot: &Option<Bytes>) -> Value {
            slot.clone().map(Value::String).unwrap_or(Value::Nil)
        }
        fn number<T: Into<f64> + Copy>(slot: &Option<T>) -> Value {
            slot.map(|n| Value::Number(n.into())).unwrap_or(Value::Nil)
        }

        match self {
            RichValue::Date(ms) => vec![ms.map(|n| Value::Number(n as f64)).unwrap_or(Value::Nil)],
            RichValue::Timestamp { time, increment } => vec![number(time), number(increment)],
            RichValue::RegEx { pattern, flags } => vec![bytes(pattern), bytes(flags)],
            RichValue::NumberInt(n) => vec![number(n)],
            RichValue::NumberLong(n) => vec![n.map(|n| Value::Number(n as f64)).unwrap_or(Value::Nil)],
            RichValue::Symbol(s) => vec![bytes(s)],
            RichValue::BinData(b) => vec![bytes(b)],
            RichValue::ObjectId(hex) => vec![hex.clone().map(Value::from).unwrap_or(Value::Nil)],
            RichValue::Null => Vec::new(),
        }
    }

    /// 数值类载荷 (NumberInt、NumberLong、Date、Timestamp 的秒数) 转为宿主数字
    pub fn numeric_payload(&self) -> Option<f64> {
        match self {
            RichValue::NumberInt(n) => n.map(f64::from),
            RichValue::NumberLong(n) => n.map(|n| n as f64),
            RichValue::Date(ms) => ms.map(|n| n as f64),
            RichValue::Timestamp { time, .. } => time.map(f64::from),
            _ => None,
        }
    }

    pub fn to_display_string(&self) -> String {
        const MISSING: &str = "nil";

        fn lossy(slot: &Option<Bytes>) -> String {
            slot.as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default()
        }

        match self {
            RichValue::Date(Some(ms)) => format_date(*ms),
            RichValue::Timestamp { time: Some(time), increment } => {
                format!("{}|{}", time, increment.unwrap_or(0))
            }
            RichValue::RegEx { pattern, flags } => format!("/{}/{}", lossy(pattern), lossy(flags)),
            RichValue::NumberInt(Some(n)) => n.to_string(),
            RichValue::NumberLong(Some(n)) => n.to_string(),
            RichValue::Symbol(Some(s)) => String::from_utf8_lossy(s).into_owned(),
            RichValue::BinData(Some(b)) => hex::encode(b),
            RichValue::ObjectId(Some(hex)) => hex.clone(),
            RichValue::Null => "NULL".to_string(),
            _ => MISSING.to_string(),
        }
    }
}

/// `ctime` 风格的日历字符串 (UTC)，不带结尾换行
fn format_date(ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%a %b %e %H:%M:%S %Y").to_string(),
        None => ms.to_string(),
    }
}

/// 扩展类型包装值
///
/// 共享句柄：克隆后指向同一个载荷，`call`/`set` 的修改对所有引用可见。
#[derive(Clone)]
pub struct Rich(Rc<RefCell<RichValue>>);

impl Rich {
    pub fn new(value: RichValue) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn kind(&self) -> RichKind {
        self.0.borrow().kind()
    }

    /// 载荷的拷贝
    pub fn value(&self) -> RichValue {
        self.0.borrow().clone()
    }

    /// 替换载荷，返回旧值；新载荷必须是同一种类型
    pub fn replace(&self, value: RichValue) -> CodecResult<RichValue> {
        let kind = self.kind();
        if value.kind() != kind {
            return Err(CodecError::BadArgument {
                function: kind.name(),
                position: 1,
                message: format!("{} expected, got {}", kind.qualified_name(), value.kind().qualified_name()),
            });
        }
        Ok(self.0.replace(value))
    }

    pub fn ptr_eq(&self, other: &Rich) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self) -> Vec<Value> {
        self.0.borrow().slots()
    }

    /// 以构造函数相同的规则校验参数并原地替换载荷
    pub fn set(&self, args: &[Value]) -> CodecResult<()> {
        let value = build(self.kind(), args)?;
        *self.0.borrow_mut() = value;
        Ok(())
    }

    /// 包装值作为函数被调用
    ///
    /// # Arguments
    /// * `args` - 为空时读取载荷；否则用其替换载荷
    ///
    /// # Returns
    /// 读取时返回载荷槽，写入时返回空列表
    pub fn call(&self, args: &[Value]) -> CodecResult<Vec<Value>> {
        if args.is_empty() {
            Ok(self.get())
        } else {
            self.set(args)?;
            Ok(Vec::new())
        }
    }

    pub fn to_display_string(&self) -> String {
        self.0.borrow().to_display_string()
    }
}

impl PartialEq for Rich {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Debug for Rich {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rich({:?})", self.0.borrow())
    }
}

impl fmt::Display for Rich {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

// ============================================================================
// 构造函数
// ============================================================================

/// 按类型构造包装值
///
/// # Arguments
/// * `kind` - 扩展类型
/// * `args` - 宿主传入的参数
///
/// # Returns
/// 新的包装值；参数类型不符时返回 `BadArgument`
pub fn construct(kind: RichKind, args: &[Value]) -> CodecResult<Value> {
    Ok(Value::Rich(Rich::new(build(kind, args)?)))
}

/// 按构造函数名构造包装值，例如 `construct_by_name("NumberLong", ..)`
pub fn construct_by_name(name: &str, args: &[Value]) -> CodecResult<Value> {
    let kind = RichKind::from_name(name)
        .ok_or_else(|| CodecError::UnknownRichType(name.to_string()))?;
    construct(kind, args)
}

fn build(kind: RichKind, args: &[Value]) -> CodecResult<RichValue> {
    let f = kind.name();
    let value = match kind {
        RichKind::Date => RichValue::Date(opt_number(f, args, 1)?.map(|n| n as i64)),
        RichKind::Timestamp => RichValue::Timestamp {
            time: opt_u32(f, args, 1)?,
            increment: opt_u32(f, args, 2)?,
        },
        RichKind::RegEx => RichValue::RegEx {
            pattern: opt_string(f, args, 1)?,
            flags: opt_string(f, args, 2)?,
        },
        RichKind::NumberInt => RichValue::NumberInt(opt_number(f, args, 1)?.map(wrap_i32)),
        RichKind::NumberLong => RichValue::NumberLong(opt_long(f, args, 1)?),
        RichKind::Symbol => RichValue::Symbol(opt_string(f, args, 1)?),
        RichKind::BinData => RichValue::BinData(opt_string(f, args, 1)?),
        RichKind::ObjectId => RichValue::ObjectId(Some(match opt_string(f, args, 1)? {
            Some(hex) => parse_object_id(f, &hex)?,
            None => bson::oid::ObjectId::new().to_hex(),
        })),
        RichKind::Null => RichValue::Null,
    };
    Ok(value)
}

fn arg(args: &[Value], position: usize) -> &Value {
    args.get(position - 1).unwrap_or(&Value::Nil)
}

fn bad_argument(function: &'static str, position: usize, expected: &str, got: &Value) -> CodecError {
    CodecError::BadArgument {
        function,
        position,
        message: format!("{} expected, got {}", expected, got.kind_name()),
    }
}

fn opt_number(function: &'static str, args: &[Value], position: usize) -> CodecResult<Option<f64>> {
    match arg(args, position) {
        Value::Nil => Ok(None),
        Value::Number(n) => Ok(Some(*n)),
        v @ Value::String(_) => to_number(v, None)
            .map(Some)
            .ok_or_else(|| bad_argument(function, position, "number", v)),
        other => Err(bad_argument(function, position, "number", other)),
    }
}

fn opt_u32(function: &'static str, args: &[Value], position: usize) -> CodecResult<Option<u32>> {
    match opt_number(function, args, position)? {
        Some(n) if (0.0..=f64::from(u32::MAX)).contains(&n) => Ok(Some(n as u32)),
        Some(n) => Err(CodecError::BadArgument {
            function,
            position,
            message: format!("{} out of range", format_number(n)),
        }),
        None => Ok(None),
    }
}

/// 截断小数后按 32 位回绕，与 C 的整数转换一致
fn wrap_i32(n: f64) -> i32 {
    (n as i64) as i32
}

fn opt_string(function: &'static str, args: &[Value], position: usize) -> CodecResult<Option<Bytes>> {
    match arg(args, position) {
        Value::Nil => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(Bytes::from(format_number(*n)))),
        other => Err(bad_argument(function, position, "string", other)),
    }
}

/// 十进制字符串按 64 位整数精确解析，数字按截断处理
fn opt_long(function: &'static str, args: &[Value], position: usize) -> CodecResult<Option<i64>> {
    let value = arg(args, position);
    if let Value::String(s) = value {
        let exact = std::str::from_utf8(s)
            .ok()
            .and_then(|text| text.trim().parse::<i64>().ok());
        if exact.is_some() {
            return Ok(exact);
        }
    }
    Ok(opt_number(function, args, position)?.map(|n| n as i64))
}

fn parse_object_id(function: &'static str, hex: &[u8]) -> CodecResult<String> {
    std::str::from_utf8(hex)
        .ok()
        .and_then(|text| bson::oid::ObjectId::parse_str(text).ok())
        .map(|oid| oid.to_hex())
        .ok_or_else(|| CodecError::BadArgument {
            function,
            position: 1,
            message: format!("invalid ObjectId {:?}", String::from_utf8_lossy(hex)),
        })
}
