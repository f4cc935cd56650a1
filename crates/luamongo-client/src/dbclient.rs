//! 数据库客户端
//!
//! 把宿主传入的文档参数编码为 BSON，交给驱动执行，再把结果解码回动态值。
//! 任何参数编码失败都发生在调用驱动之前，驱动不会收到半成品文档。

use crate::args::DocumentArg;
use crate::cursor::Cursor;
use crate::driver::{command_ok, Driver, QueryRequest};
use crate::gridfs::{GridFileBuilder, GridFs};
use crate::query::{QueryArg, QueryOptions};
use bson::{doc, Bson, Document};
use luamongo_codec::{Codec, Table, Value};
use luamongo_common::config::{ClientConfig, LuaMongoConfig};
use luamongo_common::{DatabaseName, LuaMongoError, LuaMongoResult, Namespace};
use std::collections::HashSet;
use tracing::{debug, info};

pub const CONNECTION_TYPE_NAME: &str = "mongo.Connection";

/// 查询的附加参数
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// 返回的最大文档数，0 表示不限
    pub limit: i32,
    pub skip: i32,
    /// 字段投影
    pub fields: Option<DocumentArg>,
    pub options: QueryOptions,
    /// 0 表示使用客户端配置
    pub batch_size: u32,
}

/// 数据库客户端
pub struct DbClient<D: Driver> {
    driver: D,
    codec: Codec,
    config: ClientConfig,
    ensured_indexes: HashSet<(String, String)>,
}

impl<D: Driver> DbClient<D> {
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, LuaMongoConfig::default())
    }

    pub fn with_config(driver: D, config: LuaMongoConfig) -> Self {
        info!(server = %driver.server_address(), "client created");
        Self {
            driver,
            codec: Codec::new(config.codec),
            config: config.client,
            ensured_indexes: HashSet::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn server_address(&self) -> String {
        self.driver.server_address()
    }

    pub fn is_failed(&self) -> bool {
        self.driver.is_failed()
    }

    fn document(&self, arg: impl Into<DocumentArg>) -> LuaMongoResult<Document> {
        arg.into().into_document(&self.codec)
    }

    fn query_document(&self, query: impl Into<QueryArg>) -> LuaMongoResult<Document> {
        Ok(query.into().into_query(&self.codec)?.to_document())
    }

    /// 插入单个文档
    pub fn insert(&mut self, ns: &str, doc: impl Into<DocumentArg>) -> LuaMongoResult<()> {
        let ns = Namespace::parse(ns)?;
        let doc = self.document(doc)?;
        debug!(%ns, "insert");
        self.driver.insert(&ns, vec![doc])
    }

    /// 批量插入
    ///
    /// # Arguments
    /// * `ns` - 命名空间
    /// * `docs` - 表的数组 (键 1..N)；任一元素编码失败则什么都不插入
    pub fn insert_batch(&mut self, ns: &str, docs: &Value) -> LuaMongoResult<()> {
        let ns = Namespace::parse(ns)?;
        let table = docs
            .as_table()
            .ok_or_else(|| LuaMongoError::InvalidArgument(format!("table expected, got {}", docs.kind_name())))?;
        let batch = (1..=table.sequence_len())
            .map(|i| self.codec.encode(&table.get(i)).map_err(LuaMongoError::from))
            .collect::<LuaMongoResult<Vec<_>>>()?;
        debug!(%ns, count = batch.len(), "insert batch");
        self.driver.insert(&ns, batch)
    }

    /// 查询，返回游标
    pub fn query(
        &mut self,
        ns: &str,
        query: Option<QueryArg>,
        options: FindOptions,
    ) -> LuaMongoResult<Cursor> {
        let ns = Namespace::parse(ns)?;
        let query = match query {
            Some(query) => self.query_document(query)?,
            None => Document::new(),
        };
        let fields = options.fields.map(|f| self.document(f)).transpose()?;
        let batch_size = match options.batch_size {
            0 => self.config.batch_size,
            n => n,
        };
        let request = QueryRequest {
            query,
            limit: options.limit,
            skip: options.skip,
            fields,
            options: options.options,
            batch_size,
        };
        debug!(%ns, ?request, "query");
        let docs = self.driver.query(&ns, request)?;
        Ok(Cursor::new(ns, docs, self.codec.clone()))
    }

    /// 查询单个文档，没有结果时返回 Nil
    pub fn find_one(
        &mut self,
        ns: &str,
        query: Option<QueryArg>,
        fields: Option<DocumentArg>,
        options: QueryOptions,
    ) -> LuaMongoResult<Value> {
        let find = FindOptions {
            limit: -1,
            fields,
            options,
            ..FindOptions::default()
        };
        let mut cursor = self.query(ns, query, find)?;
        Ok(cursor.next()?.unwrap_or(Value::Nil))
    }

    pub fn count(&mut self, ns: &str, query: Option<DocumentArg>) -> LuaMongoResult<u64> {
        let ns = Namespace::parse(ns)?;
        let filter = match query {
            Some(query) => self.document(query)?,
            None => Document::new(),
        };
        self.driver.count(&ns, filter)
    }

    pub fn remove(&mut self, ns: &str, query: impl Into<QueryArg>, just_one: bool) -> LuaMongoResult<()> {
        let ns = Namespace::parse(ns)?;
        let filter = self.query_document(query)?;
        debug!(%ns, just_one, "remove");
        self.driver.remove(&ns, filter, just_one)
    }

    pub fn update(
        &mut self,
        ns: &str,
        query: impl Into<QueryArg>,
        update: impl Into<DocumentArg>,
        upsert: bool,
        multi: bool,
    ) -> LuaMongoResult<()> {
        let ns = Namespace::parse(ns)?;
        let filter = self.query_document(query)?;
        let update = self.document(update)?;
        debug!(%ns, upsert, multi, "update");
        self.driver.update(&ns, filter, update, upsert, multi)
    }

    /// 执行数据库命令，返回解码后的回复
    pub fn run_command(&mut self, database: &str, command: impl Into<DocumentArg>) -> LuaMongoResult<Value> {
        let command = self.document(command)?;
        let reply = self.driver.run_command(database, command)?;
        Ok(self.codec.decode(&reply)?)
    }

    /// 确保索引存在
    ///
    /// # Arguments
    /// * `ns` - 命名空间
    /// * `keys` - 索引键文档，例如 `{ "name": 1, "age": -1 }`
    /// * `unique` - 是否唯一索引
    /// * `name` - 索引名；为空时按键生成
    ///
    /// # Returns
    /// 本客户端已经确保过同名索引时返回 false，否则发送命令并返回 true
    pub fn ensure_index(
        &mut self,
        ns: &str,
        keys: impl Into<DocumentArg>,
        unique: bool,
        name: Option<&str>,
    ) -> LuaMongoResult<bool> {
        let namespace = Namespace::parse(ns)?;
        let keys = self.document(keys)?;
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => index_name(&keys),
        };
        let cache_key = (namespace.to_string(), name.clone());
        if self.ensured_indexes.contains(&cache_key) {
            return Ok(false);
        }

        let mut index = doc! { "key": keys, "name": name.as_str() };
        if unique {
            index.insert("unique", true);
        }
        let command = doc! {
            "createIndexes": namespace.collection(),
            "indexes": [index],
        };
        let reply = self.driver.run_command(namespace.database(), command)?;
        if !command_ok(&reply) {
            let errmsg = reply.get_str("errmsg").unwrap_or("createIndexes failed");
            return Err(LuaMongoError::Command(errmsg.to_string()));
        }
        info!(ns = %namespace, index = %name, "index ensured");
        self.ensured_indexes.insert(cache_key);
        Ok(true)
    }

    /// 按键文档生成索引名，例如 `name_1_age_-1`
    pub fn gen_index_name(&self, keys: impl Into<DocumentArg>) -> LuaMongoResult<String> {
        Ok(index_name(&self.document(keys)?))
    }

    /// 执行命令，`ok` 不为真时以 `errmsg` 报错
    fn checked_command(&mut self, database: &str, command: Document, name: &str) -> LuaMongoResult<Document> {
        let reply = self.driver.run_command(database, command)?;
        if !command_ok(&reply) {
            let errmsg = reply
                .get_str("errmsg")
                .map(str::to_string)
                .unwrap_or_else(|_| format!("{} failed", name));
            return Err(LuaMongoError::Command(errmsg));
        }
        Ok(reply)
    }

    fn forget_indexes(&mut self, ns: &Namespace, name: Option<&str>) {
        let ns = ns.to_string();
        self.ensured_indexes
            .retain(|(cached_ns, cached_name)| *cached_ns != ns || name.map_or(false, |n| n != cached_name.as_str()));
    }

    /// 删除集合，同时清掉本客户端对该集合的索引缓存
    pub fn drop_collection(&mut self, ns: &str) -> LuaMongoResult<()> {
        let namespace = Namespace::parse(ns)?;
        let command = doc! { "drop": namespace.collection() };
        self.checked_command(namespace.database(), command, "drop")?;
        self.forget_indexes(&namespace, None);
        info!(ns = %namespace, "collection dropped");
        Ok(())
    }

    /// 删除集合上的全部索引
    pub fn drop_indexes(&mut self, ns: &str) -> LuaMongoResult<()> {
        let namespace = Namespace::parse(ns)?;
        let command = doc! { "dropIndexes": namespace.collection(), "index": "*" };
        self.checked_command(namespace.database(), command, "dropIndexes")?;
        self.forget_indexes(&namespace, None);
        Ok(())
    }

    /// 按键文档删除索引，索引名的生成规则同 `gen_index_name`
    pub fn drop_index_by_fields(&mut self, ns: &str, keys: impl Into<DocumentArg>) -> LuaMongoResult<()> {
        let name = index_name(&self.document(keys)?);
        self.drop_index_by_name(ns, &name)
    }

    pub fn drop_index_by_name(&mut self, ns: &str, name: &str) -> LuaMongoResult<()> {
        let namespace = Namespace::parse(ns)?;
        let command = doc! { "dropIndexes": namespace.collection(), "index": name };
        self.checked_command(namespace.database(), command, "dropIndexes")?;
        self.forget_indexes(&namespace, Some(name));
        debug!(ns = %namespace, index = name, "index dropped");
        Ok(())
    }

    /// 列出集合上的索引
    ///
    /// # Returns
    /// 逐个返回索引描述文档的游标
    pub fn get_indexes(&mut self, ns: &str) -> LuaMongoResult<Cursor> {
        let namespace = Namespace::parse(ns)?;
        let command = doc! { "listIndexes": namespace.collection() };
        let reply = self.checked_command(namespace.database(), command, "listIndexes")?;
        Ok(Cursor::new(namespace, first_batch(&reply), self.codec.clone()))
    }

    /// 集合是否存在
    pub fn exists(&mut self, ns: &str) -> LuaMongoResult<bool> {
        let namespace = Namespace::parse(ns)?;
        let command = doc! {
            "listCollections": 1,
            "filter": { "name": namespace.collection() },
        };
        let reply = self.checked_command(namespace.database(), command, "listCollections")?;
        Ok(!first_batch(&reply).is_empty())
    }

    fn last_error_reply(&mut self) -> LuaMongoResult<Document> {
        self.driver.run_command("admin", doc! { "getlasterror": 1 })
    }

    /// 上一次操作的错误信息，没有错误时为空字符串
    pub fn get_last_error(&mut self) -> LuaMongoResult<String> {
        let reply = self.last_error_reply()?;
        Ok(reply.get_str("err").unwrap_or_default().to_string())
    }

    /// 完整的 `getlasterror` 回复
    pub fn get_last_error_detailed(&mut self) -> LuaMongoResult<Value> {
        let reply = self.last_error_reply()?;
        Ok(self.codec.decode(&reply)?)
    }

    /// 重建集合上的全部索引
    pub fn reindex(&mut self, ns: &str) -> LuaMongoResult<()> {
        let namespace = Namespace::parse(ns)?;
        let command = doc! { "reIndex": namespace.collection() };
        self.checked_command(namespace.database(), command, "reIndex")?;
        Ok(())
    }

    /// 执行 map/reduce
    ///
    /// # Arguments
    /// * `ns` - 输入集合
    /// * `map` - JavaScript map 函数
    /// * `reduce` - JavaScript reduce 函数
    /// * `query` - 可选的输入过滤
    /// * `output` - 输出集合名；为空时结果内联返回
    ///
    /// # Returns
    /// 解码后的命令回复
    pub fn mapreduce(
        &mut self,
        ns: &str,
        map: &str,
        reduce: &str,
        query: Option<DocumentArg>,
        output: Option<&str>,
    ) -> LuaMongoResult<Value> {
        let namespace = Namespace::parse(ns)?;
        let mut command = doc! {
            "mapreduce": namespace.collection(),
            "map": Bson::JavaScriptCode(map.to_string()),
            "reduce": Bson::JavaScriptCode(reduce.to_string()),
        };
        if let Some(query) = query {
            command.insert("query", self.document(query)?);
        }
        match output.filter(|o| !o.is_empty()) {
            Some(output) => command.insert("out", output),
            None => command.insert("out", doc! { "inline": 1 }),
        };
        let reply = self.driver.run_command(namespace.database(), command)?;
        Ok(self.codec.decode(&reply)?)
    }

    /// 在服务器端执行 JavaScript
    ///
    /// # Arguments
    /// * `database` - 数据库名
    /// * `code` - 函数源码
    /// * `args` - 可选的参数表，按数组顺序传给函数
    ///
    /// # Returns
    /// 解码后的 `retval`
    pub fn eval(&mut self, database: &str, code: &str, args: Option<&Value>) -> LuaMongoResult<Value> {
        let database = DatabaseName::new(database)?;
        let args = match args {
            Some(args) => {
                let wrapper = Table::new();
                wrapper.set("args", args.clone());
                self.codec
                    .encode(&Value::Table(wrapper))?
                    .remove("args")
                    .unwrap_or_else(|| Bson::Array(Vec::new()))
            }
            None => Bson::Array(Vec::new()),
        };
        let command = doc! { "$eval": Bson::JavaScriptCode(code.to_string()), "args": args };
        let reply = self.checked_command(database.as_str(), command, "$eval")?;
        let retval = reply.get("retval").cloned().unwrap_or(Bson::Null);
        Ok(self.codec.decode_element(&retval)?)
    }

    /// 清空本客户端记住的已确保索引
    pub fn reset_index_cache(&mut self) {
        self.ensured_indexes.clear();
    }

    /// 打开指定数据库的 GridFS
    ///
    /// # Arguments
    /// * `database` - 数据库名
    /// * `prefix` - 集合前缀；为空时使用客户端配置
    pub fn grid_fs(&self, database: &str, prefix: Option<&str>) -> LuaMongoResult<GridFs> {
        let prefix = prefix.filter(|p| !p.is_empty()).unwrap_or(&self.config.gridfs_prefix);
        GridFs::new(database, prefix, self.config.chunk_size, self.codec.clone())
    }

    /// 为指定数据库创建 GridFS 写入器，使用客户端配置的分块大小和前缀
    pub fn grid_file_builder(&self, database: &str) -> LuaMongoResult<GridFileBuilder> {
        GridFileBuilder::new(
            database,
            self.config.chunk_size,
            &self.config.gridfs_prefix,
            self.codec.clone(),
        )
    }
}

/// 列表类命令回复中的 `cursor.firstBatch`
fn first_batch(reply: &Document) -> Vec<Document> {
    reply
        .get_document("cursor")
        .and_then(|cursor| cursor.get_array("firstBatch"))
        .map(|batch| batch.iter().filter_map(|b| b.as_document().cloned()).collect())
        .unwrap_or_default()
}

/// 数字值取整，字符串值原样，其它类型为空
fn index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(field, value)| {
            let suffix = match value {
                Bson::Int32(n) => n.to_string(),
                Bson::Int64(n) => (*n as i32).to_string(),
                Bson::Double(n) => (*n as i32).to_string(),
                Bson::String(s) => s.clone(),
                _ => String::new(),
            };
            format!("{}_{}", field, suffix)
        })
        .collect::<Vec<_>>()
        .join("_")
}
