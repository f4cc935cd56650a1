//! 查询构建器
//!
//! 与旧版驱动的查询对象形状一致：只有过滤条件时发送过滤文档本身；
//! 一旦设置了排序、提示、explain 等修饰符，就发送
//! `{ query: <filter>, orderby: .., $hint: .., ... }` 形式的复合查询。

use crate::args::DocumentArg;
use bson::{Bson, Document, JavaScriptCodeWithScope};
use luamongo_codec::{Codec, Table};
use luamongo_common::LuaMongoResult;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

const QUERY: &str = "query";
const ORDER_BY: &str = "orderby";
const HINT: &str = "$hint";
const MIN: &str = "$min";
const MAX: &str = "$max";
const EXPLAIN: &str = "$explain";
const SNAPSHOT: &str = "$snapshot";
const WHERE: &str = "$where";

/// 查询对象
#[derive(Debug, Clone, Default)]
pub struct Query {
    filter: Document,
    modifiers: Document,
    codec: Codec,
}

impl Query {
    /// 创建查询
    ///
    /// # Arguments
    /// * `filter` - 过滤条件；已经是复合查询形状 (`{query: ..}`) 时拆出修饰符
    pub fn new(filter: Option<DocumentArg>) -> LuaMongoResult<Self> {
        Self::with_codec(filter, Codec::default())
    }

    pub fn with_codec(filter: Option<DocumentArg>, codec: Codec) -> LuaMongoResult<Self> {
        let doc = match filter {
            Some(arg) => arg.into_document(&codec)?,
            None => Document::new(),
        };
        let mut query = Self { codec, ..Self::default() };
        query.set_document(doc);
        Ok(query)
    }

    fn set_document(&mut self, mut doc: Document) {
        let inner = match doc.get("query").or_else(|| doc.get("$query")) {
            Some(Bson::Document(inner)) => Some(inner.clone()),
            _ => None,
        };
        match inner {
            Some(inner) => {
                doc.remove("query");
                doc.remove("$query");
                self.filter = inner;
                self.modifiers = doc;
            }
            None => self.filter = doc,
        }
    }

    fn modifier(&mut self, key: &str, value: impl Into<Bson>) -> &mut Self {
        self.modifiers.insert(key, value);
        self
    }

    fn document_modifier(&mut self, key: &str, arg: DocumentArg) -> LuaMongoResult<&mut Self> {
        let doc = arg.into_document(&self.codec)?;
        Ok(self.modifier(key, doc))
    }

    /// 按排序文档排序，例如 `{ "age": -1 }`
    pub fn sort(&mut self, order: impl Into<DocumentArg>) -> LuaMongoResult<&mut Self> {
        self.document_modifier(ORDER_BY, order.into())
    }

    /// 按单个字段排序
    pub fn sort_field(&mut self, field: &str, ascending: bool) -> &mut Self {
        let mut order = Document::new();
        order.insert(field, if ascending { 1i32 } else { -1i32 });
        self.modifier(ORDER_BY, order)
    }

    pub fn hint(&mut self, key_pattern: impl Into<DocumentArg>) -> LuaMongoResult<&mut Self> {
        self.document_modifier(HINT, key_pattern.into())
    }

    pub fn min_key(&mut self, bound: impl Into<DocumentArg>) -> LuaMongoResult<&mut Self> {
        self.document_modifier(MIN, bound.into())
    }

    pub fn max_key(&mut self, bound: impl Into<DocumentArg>) -> LuaMongoResult<&mut Self> {
        self.document_modifier(MAX, bound.into())
    }

    pub fn explain(&mut self) -> &mut Self {
        self.modifier(EXPLAIN, true)
    }

    pub fn snapshot(&mut self) -> &mut Self {
        self.modifier(SNAPSHOT, true)
    }

    /// 追加 `$where` 条件
    ///
    /// # Arguments
    /// * `code` - JavaScript 代码
    /// * `scope` - 可选的作用域文档；提供时写为 CodeWithScope
    pub fn where_js(&mut self, code: &str, scope: Option<DocumentArg>) -> LuaMongoResult<&mut Self> {
        let value = match scope {
            Some(scope) => Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
                code: code.to_string(),
                scope: scope.into_document(&self.codec)?,
            }),
            None => Bson::JavaScriptCode(code.to_string()),
        };
        self.filter.insert(WHERE, value);
        Ok(self)
    }

    /// 设置了任何修饰符即为复合查询
    pub fn is_complex(&self) -> bool {
        !self.modifiers.is_empty()
    }

    pub fn is_explain(&self) -> bool {
        self.modifiers.get_bool(EXPLAIN).unwrap_or(false)
    }

    pub fn filter(&self) -> &Document {
        &self.filter
    }

    /// 发送给驱动的查询文档
    pub fn to_document(&self) -> Document {
        if !self.is_complex() {
            return self.filter.clone();
        }
        let mut doc = Document::new();
        doc.insert(QUERY, self.filter.clone());
        for (key, value) in &self.modifiers {
            doc.insert(key.clone(), value.clone());
        }
        doc
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}

/// 查询参数：查询对象或任意文档参数
#[derive(Debug, Clone)]
pub enum QueryArg {
    Query(Query),
    Document(DocumentArg),
}

impl QueryArg {
    pub fn into_query(self, codec: &Codec) -> LuaMongoResult<Query> {
        match self {
            QueryArg::Query(query) => Ok(query),
            QueryArg::Document(arg) => Query::with_codec(Some(arg), codec.clone()),
        }
    }
}

impl From<Query> for QueryArg {
    fn from(query: Query) -> Self {
        QueryArg::Query(query)
    }
}

impl From<DocumentArg> for QueryArg {
    fn from(arg: DocumentArg) -> Self {
        QueryArg::Document(arg)
    }
}

impl From<&str> for QueryArg {
    fn from(s: &str) -> Self {
        QueryArg::Document(s.into())
    }
}

impl From<Table> for QueryArg {
    fn from(t: Table) -> Self {
        QueryArg::Document(t.into())
    }
}

impl From<Document> for QueryArg {
    fn from(doc: Document) -> Self {
        QueryArg::Document(doc.into())
    }
}

/// 查询选项位标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct QueryOptions(i32);

impl QueryOptions {
    pub const NONE: QueryOptions = QueryOptions(0);
    pub const CURSOR_TAILABLE: QueryOptions = QueryOptions(1 << 1);
    pub const SLAVE_OK: QueryOptions = QueryOptions(1 << 2);
    pub const OPLOG_REPLAY: QueryOptions = QueryOptions(1 << 3);
    pub const NO_CURSOR_TIMEOUT: QueryOptions = QueryOptions(1 << 4);
    pub const AWAIT_DATA: QueryOptions = QueryOptions(1 << 5);
    pub const EXHAUST: QueryOptions = QueryOptions(1 << 6);
    pub const ALL_SUPPORTED: QueryOptions = QueryOptions(
        Self::CURSOR_TAILABLE.0
            | Self::SLAVE_OK.0
            | Self::OPLOG_REPLAY.0
            | Self::NO_CURSOR_TIMEOUT.0
            | Self::AWAIT_DATA.0
            | Self::EXHAUST.0,
    );

    /// 宿主传入的整数标志，未知位被丢弃
    pub fn from_bits_truncate(bits: i32) -> Self {
        QueryOptions(bits & Self::ALL_SUPPORTED.0)
    }

    pub fn bits(self) -> i32 {
        self.0
    }

    pub fn contains(self, other: QueryOptions) -> bool {
        self.0 & other.0 == other.0
    }

    /// 宿主侧注册的 `(名字, 值)` 常量表
    pub fn constants() -> [(&'static str, i32); 7] {
        [
            ("CursorTailable", Self::CURSOR_TAILABLE.0),
            ("SlaveOk", Self::SLAVE_OK.0),
            ("OplogReplay", Self::OPLOG_REPLAY.0),
            ("NoCursorTimeout", Self::NO_CURSOR_TIMEOUT.0),
            ("AwaitData", Self::AWAIT_DATA.0),
            ("Exhaust", Self::EXHAUST.0),
            ("AllSupported", Self::ALL_SUPPORTED.0),
        ]
    }
}

impl BitOr for QueryOptions {
    type Output = QueryOptions;

    fn bitor(self, rhs: QueryOptions) -> QueryOptions {
        QueryOptions(self.0 | rhs.0)
    }
}

impl BitOrAssign for QueryOptions {
    fn bitor_assign(&mut self, rhs: QueryOptions) {
        self.0 |= rhs.0;
    }
}
