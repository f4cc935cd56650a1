//! 驱动边界
//!
//! 网络协议、连接管理由外部驱动负责；客户端只通过 [`Driver`] trait
//! 提交已经编码好的 BSON 文档。

use crate::query::QueryOptions;
use bson::{Bson, Document};
use luamongo_common::{LuaMongoResult, Namespace};

/// 发送给驱动的查询请求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// 过滤文档或复合查询文档
    pub query: Document,
    /// 返回的最大文档数，0 表示不限
    pub limit: i32,
    pub skip: i32,
    /// 字段投影
    pub fields: Option<Document>,
    pub options: QueryOptions,
    pub batch_size: u32,
}

/// 数据库驱动
pub trait Driver {
    fn insert(&mut self, ns: &Namespace, docs: Vec<Document>) -> LuaMongoResult<()>;

    fn query(&mut self, ns: &Namespace, request: QueryRequest) -> LuaMongoResult<Vec<Document>>;

    fn count(&mut self, ns: &Namespace, filter: Document) -> LuaMongoResult<u64>;

    fn remove(&mut self, ns: &Namespace, filter: Document, just_one: bool) -> LuaMongoResult<()>;

    fn update(
        &mut self,
        ns: &Namespace,
        filter: Document,
        update: Document,
        upsert: bool,
        multi: bool,
    ) -> LuaMongoResult<()>;

    /// 在指定数据库上执行命令，返回服务器的原始回复
    fn run_command(&mut self, database: &str, command: Document) -> LuaMongoResult<Document>;

    fn server_address(&self) -> String;

    fn is_failed(&self) -> bool;
}

/// 命令回复中的 `ok` 字段是否为真
pub fn command_ok(reply: &Document) -> bool {
    match reply.get("ok") {
        Some(Bson::Double(n)) => *n == 1.0,
        Some(Bson::Int32(n)) => *n == 1,
        Some(Bson::Int64(n)) => *n == 1,
        Some(Bson::Boolean(b)) => *b,
        _ => false,
    }
}
