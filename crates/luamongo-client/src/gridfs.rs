//! GridFS
//!
//! 写入时把追加的字节流切成固定大小的块，每个满块立即写入 `<db>.<prefix>.chunks`；
//! 不满一块的尾部暂存，直到 `build_file` 时写出并生成文件文档。
//! 读取时按 `files_id` 和 `n` 取回块，按序拼接。

use crate::cursor::Cursor;
use crate::driver::{command_ok, Driver, QueryRequest};
use bson::oid::ObjectId;
use bson::spec::BinarySubtype;
use bson::{doc, Binary, Bson, DateTime, Document};
use luamongo_codec::{Codec, Value};
use luamongo_common::config::MAX_CHUNK_SIZE;
use luamongo_common::{DatabaseName, LuaMongoError, LuaMongoResult, Namespace};
use std::path::Path;
use tracing::{debug, info};

pub const GRIDFS_TYPE_NAME: &str = "mongo.GridFS";
pub const GRIDFILE_TYPE_NAME: &str = "mongo.GridFile";
pub const GRIDFSCHUNK_TYPE_NAME: &str = "mongo.GridFSChunk";

/// 文件长度小于该值时写为 Int32
const INT32_LENGTH_LIMIT: u64 = 1 << 30;

pub struct GridFileBuilder {
    database: DatabaseName,
    prefix: String,
    chunks_ns: Namespace,
    files_ns: Namespace,
    chunk_size: usize,
    codec: Codec,
    file_id: ObjectId,
    current_chunk: i32,
    pending: Vec<u8>,
    file_length: u64,
}

impl GridFileBuilder {
    /// 创建写入器
    ///
    /// # Arguments
    /// * `database` - 数据库名
    /// * `chunk_size` - 分块大小，范围 1..=`MAX_CHUNK_SIZE`
    /// * `prefix` - 集合前缀，通常为 `fs`
    /// * `codec` - 解码文件文档使用的编解码器
    pub fn new(database: &str, chunk_size: usize, prefix: &str, codec: Codec) -> LuaMongoResult<Self> {
        check_chunk_size(chunk_size)?;
        let database = DatabaseName::new(database)?;
        let chunks_ns = Namespace::new(database.as_str(), format!("{}.chunks", prefix))?;
        let files_ns = Namespace::new(database.as_str(), format!("{}.files", prefix))?;
        Ok(Self {
            database,
            prefix: prefix.to_string(),
            chunks_ns,
            files_ns,
            chunk_size,
            codec,
            file_id: ObjectId::new(),
            current_chunk: 0,
            pending: Vec::with_capacity(chunk_size),
            file_length: 0,
        })
    }

    pub fn file_id(&self) -> ObjectId {
        self.file_id
    }

    /// 已写出的块数
    pub fn chunks_written(&self) -> i32 {
        self.current_chunk
    }

    /// 暂存的尾部字节数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 追加数据，每凑满一块就写入
    pub fn append<D: Driver>(&mut self, driver: &mut D, data: &[u8]) -> LuaMongoResult<()> {
        self.pending.extend_from_slice(data);
        while self.pending.len() >= self.chunk_size {
            let rest = self.pending.split_off(self.chunk_size);
            let chunk = std::mem::replace(&mut self.pending, rest);
            self.write_chunk(driver, chunk)?;
        }
        Ok(())
    }

    fn write_chunk<D: Driver>(&mut self, driver: &mut D, data: Vec<u8>) -> LuaMongoResult<()> {
        let len = data.len() as u64;
        let chunk = doc! {
            "files_id": self.file_id,
            "n": self.current_chunk,
            "data": Binary { subtype: BinarySubtype::Generic, bytes: data },
        };
        driver.insert(&self.chunks_ns, vec![chunk])?;
        debug!(file_id = %self.file_id, n = self.current_chunk, len, "chunk written");
        self.current_chunk += 1;
        self.file_length += len;
        Ok(())
    }

    /// 写出尾部并插入文件文档
    ///
    /// # Arguments
    /// * `driver` - 数据库驱动
    /// * `name` - 文件名
    /// * `content_type` - 可选的 MIME 类型，空字符串视为未提供
    ///
    /// # Returns
    /// 解码后的文件文档；之后写入器重置为一个新文件
    pub fn build_file<D: Driver>(
        &mut self,
        driver: &mut D,
        name: &str,
        content_type: Option<&str>,
    ) -> LuaMongoResult<Value> {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.write_chunk(driver, tail)?;
        }

        let command = doc! { "filemd5": self.file_id, "root": self.prefix.as_str() };
        let reply = driver.run_command(self.database.as_str(), command)?;
        if !command_ok(&reply) {
            return Err(LuaMongoError::GridFs("filemd5 failed".to_string()));
        }
        let md5 = reply.get("md5").cloned().unwrap_or(Bson::Null);

        let mut file = doc! {
            "_id": self.file_id,
            "filename": name,
            "chunkSize": self.chunk_size as i32,
            "uploadDate": DateTime::now(),
            "md5": md5,
        };
        if self.file_length < INT32_LENGTH_LIMIT {
            file.insert("length", self.file_length as i32);
        } else {
            file.insert("length", self.file_length as i64);
        }
        if let Some(content_type) = content_type.filter(|c| !c.is_empty()) {
            file.insert("contentType", content_type);
        }

        driver.insert(&self.files_ns, vec![file.clone()])?;
        info!(file_id = %self.file_id, name, length = self.file_length, "GridFS file stored");

        self.reset();
        Ok(self.codec.decode(&file)?)
    }

    fn reset(&mut self) {
        self.file_id = ObjectId::new();
        self.current_chunk = 0;
        self.pending.clear();
        self.file_length = 0;
    }
}

fn check_chunk_size(chunk_size: usize) -> LuaMongoResult<()> {
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(LuaMongoError::GridFs(format!(
            "chunk size must be between 1 and {} bytes",
            MAX_CHUNK_SIZE
        )));
    }
    Ok(())
}

/// 单个数据库上的 GridFS 存储
#[derive(Debug, Clone)]
pub struct GridFs {
    database: DatabaseName,
    prefix: String,
    files_ns: Namespace,
    chunks_ns: Namespace,
    chunk_size: usize,
    codec: Codec,
}

impl GridFs {
    /// # Arguments
    /// * `database` - 数据库名
    /// * `prefix` - 集合前缀
    /// * `chunk_size` - 写入新文件时的分块大小
    /// * `codec` - 解码文件文档使用的编解码器
    pub fn new(database: &str, prefix: &str, chunk_size: usize, codec: Codec) -> LuaMongoResult<Self> {
        check_chunk_size(chunk_size)?;
        let database = DatabaseName::new(database)?;
        let files_ns = Namespace::new(database.as_str(), format!("{}.files", prefix))?;
        let chunks_ns = Namespace::new(database.as_str(), format!("{}.chunks", prefix))?;
        Ok(Self {
            database,
            prefix: prefix.to_string(),
            files_ns,
            chunks_ns,
            chunk_size,
            codec,
        })
    }

    pub fn files_namespace(&self) -> &Namespace {
        &self.files_ns
    }

    pub fn chunks_namespace(&self) -> &Namespace {
        &self.chunks_ns
    }

    /// 以相同的数据库、前缀和分块大小创建写入器
    pub fn builder(&self) -> LuaMongoResult<GridFileBuilder> {
        GridFileBuilder::new(self.database.as_str(), self.chunk_size, &self.prefix, self.codec.clone())
    }

    /// 按文件名查找文件
    ///
    /// # Returns
    /// 找不到时返回 `exists()` 为 false 的 [`GridFile`]
    pub fn find_file<D: Driver>(&self, driver: &mut D, filename: &str) -> LuaMongoResult<GridFile> {
        let request = QueryRequest {
            query: doc! { "filename": filename },
            limit: -1,
            ..QueryRequest::default()
        };
        let doc = driver.query(&self.files_ns, request)?.into_iter().next();
        debug!(ns = %self.files_ns, filename, found = doc.is_some(), "find file");
        Ok(GridFile {
            doc,
            chunks_ns: self.chunks_ns.clone(),
            codec: self.codec.clone(),
        })
    }

    /// 遍历全部文件文档
    pub fn list<D: Driver>(&self, driver: &mut D) -> LuaMongoResult<Cursor> {
        let docs = driver.query(&self.files_ns, QueryRequest::default())?;
        Ok(Cursor::new(self.files_ns.clone(), docs, self.codec.clone()))
    }

    /// 删除同名的全部文件及其块
    pub fn remove_file<D: Driver>(&self, driver: &mut D, filename: &str) -> LuaMongoResult<()> {
        let request = QueryRequest {
            query: doc! { "filename": filename },
            ..QueryRequest::default()
        };
        let files = driver.query(&self.files_ns, request)?;
        for file in &files {
            let Some(id) = file.get("_id") else {
                continue;
            };
            driver.remove(&self.chunks_ns, doc! { "files_id": id.clone() }, false)?;
            driver.remove(&self.files_ns, doc! { "_id": id.clone() }, true)?;
        }
        info!(ns = %self.files_ns, filename, removed = files.len(), "GridFS file removed");
        Ok(())
    }

    /// 把内存中的数据存为一个文件
    ///
    /// # Returns
    /// 解码后的文件文档
    pub fn store_data<D: Driver>(
        &self,
        driver: &mut D,
        data: &[u8],
        filename: &str,
        content_type: Option<&str>,
    ) -> LuaMongoResult<Value> {
        let mut builder = self.builder()?;
        builder.append(driver, data)?;
        builder.build_file(driver, filename, content_type)
    }

    /// 读取本地文件并存入 GridFS
    ///
    /// # Arguments
    /// * `driver` - 数据库驱动
    /// * `path` - 本地文件路径
    /// * `remote` - 存储的文件名；为空时使用本地路径
    /// * `content_type` - 可选的 MIME 类型
    ///
    /// # Returns
    /// 解码后的文件文档
    pub fn store_file<D: Driver>(
        &self,
        driver: &mut D,
        path: impl AsRef<Path>,
        remote: Option<&str>,
        content_type: Option<&str>,
    ) -> LuaMongoResult<Value> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let local_name = path.to_string_lossy();
        let filename = remote.filter(|r| !r.is_empty()).unwrap_or(&local_name);
        self.store_data(driver, &data, filename, content_type)
    }
}

/// GridFS 中的一个文件
#[derive(Debug, Clone)]
pub struct GridFile {
    doc: Option<Document>,
    chunks_ns: Namespace,
    codec: Codec,
}

impl GridFile {
    pub fn exists(&self) -> bool {
        self.doc.is_some()
    }

    /// 原始文件文档
    pub fn document(&self) -> Option<&Document> {
        self.doc.as_ref()
    }

    fn stored(&self) -> LuaMongoResult<&Document> {
        self.doc
            .as_ref()
            .ok_or_else(|| LuaMongoError::GridFs("file does not exist".to_string()))
    }

    /// 解码文件文档中的任意字段，字段不存在时为 Nil
    pub fn field(&self, name: &str) -> LuaMongoResult<Value> {
        match self.doc.as_ref().and_then(|doc| doc.get(name)) {
            Some(element) => Ok(self.codec.decode_element(element)?),
            None => Ok(Value::Nil),
        }
    }

    pub fn filename(&self) -> &str {
        self.doc
            .as_ref()
            .and_then(|doc| doc.get_str("filename").ok())
            .unwrap_or_default()
    }

    pub fn md5(&self) -> &str {
        self.doc.as_ref().and_then(|doc| doc.get_str("md5").ok()).unwrap_or_default()
    }

    pub fn chunk_size(&self) -> usize {
        self.integer("chunkSize") as usize
    }

    pub fn content_length(&self) -> u64 {
        self.integer("length")
    }

    /// 长度和块大小可能以 Int32、Int64 或 Double 存储
    fn integer(&self, key: &str) -> u64 {
        match self.doc.as_ref().and_then(|doc| doc.get(key)) {
            Some(Bson::Int32(n)) => (*n).max(0) as u64,
            Some(Bson::Int64(n)) => (*n).max(0) as u64,
            Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
            _ => 0,
        }
    }

    pub fn num_chunks(&self) -> u64 {
        match self.chunk_size() as u64 {
            0 => 0,
            size => self.content_length().div_ceil(size),
        }
    }

    /// 上传时间，解码为 Date 值
    pub fn upload_date(&self) -> LuaMongoResult<Value> {
        self.field("uploadDate")
    }

    pub fn metadata(&self) -> LuaMongoResult<Value> {
        self.field("metadata")
    }

    /// 读取第 `n` 块
    pub fn chunk<D: Driver>(&self, driver: &mut D, n: u64) -> LuaMongoResult<GridFsChunk> {
        let file = self.stored()?;
        if n >= self.num_chunks() {
            return Err(LuaMongoError::GridFs(format!(
                "chunk {} out of range, file has {} chunks",
                n,
                self.num_chunks()
            )));
        }
        let id = file.get("_id").cloned().unwrap_or(Bson::Null);
        let request = QueryRequest {
            query: doc! { "files_id": id, "n": (n as i32) },
            limit: -1,
            ..QueryRequest::default()
        };
        let chunk = driver
            .query(&self.chunks_ns, request)?
            .into_iter()
            .next()
            .ok_or_else(|| LuaMongoError::GridFs(format!("chunk {} not found", n)))?;
        GridFsChunk::from_document(&chunk)
    }

    /// 按块序号拼接全部数据
    pub fn data<D: Driver>(&self, driver: &mut D) -> LuaMongoResult<Vec<u8>> {
        let file = self.stored()?;
        let id = file.get("_id").cloned().unwrap_or(Bson::Null);
        let request = QueryRequest {
            query: doc! { "query": { "files_id": id }, "orderby": { "n": 1 } },
            ..QueryRequest::default()
        };
        let mut chunks = driver
            .query(&self.chunks_ns, request)?
            .iter()
            .map(GridFsChunk::from_document)
            .collect::<LuaMongoResult<Vec<_>>>()?;
        chunks.sort_by_key(|chunk| chunk.n);
        if chunks.len() as u64 != self.num_chunks() {
            return Err(LuaMongoError::GridFs(format!(
                "expected {} chunks, found {}",
                self.num_chunks(),
                chunks.len()
            )));
        }
        let mut data = Vec::with_capacity(self.content_length() as usize);
        for chunk in chunks {
            data.extend_from_slice(chunk.data());
        }
        Ok(data)
    }

    /// 写到本地文件
    ///
    /// # Returns
    /// 写出的字节数
    pub fn write<D: Driver>(&self, driver: &mut D, path: impl AsRef<Path>) -> LuaMongoResult<u64> {
        let data = self.data(driver)?;
        std::fs::write(path.as_ref(), &data)?;
        debug!(path = %path.as_ref().display(), len = data.len(), "GridFS file written");
        Ok(data.len() as u64)
    }
}

/// 文件的一个块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFsChunk {
    n: i32,
    data: Vec<u8>,
}

impl GridFsChunk {
    fn from_document(doc: &Document) -> LuaMongoResult<Self> {
        let n = match doc.get("n") {
            Some(Bson::Int32(n)) => *n,
            Some(Bson::Int64(n)) => *n as i32,
            Some(Bson::Double(n)) => *n as i32,
            _ => return Err(LuaMongoError::GridFs("chunk without n".to_string())),
        };
        let data = match doc.get("data") {
            Some(Bson::Binary(binary)) => binary.bytes.clone(),
            _ => return Err(LuaMongoError::GridFs(format!("chunk {} has no binary data", n))),
        };
        Ok(Self { n, data })
    }

    pub fn n(&self) -> i32 {
        self.n
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbclient::DbClient;
    use crate::driver::testing::{MemoryDriver, FAKE_MD5};
    use luamongo_codec::RichValue;

    fn builder(chunk_size: usize) -> GridFileBuilder {
        GridFileBuilder::new("test", chunk_size, "fs", Codec::default()).unwrap()
    }

    #[test]
    fn test_chunking() {
        let mut driver = MemoryDriver::new();
        let mut b = builder(4);
        b.append(&mut driver, b"abc").unwrap();
        assert_eq!(b.chunks_written(), 0);
        assert_eq!(b.pending_len(), 3);

        b.append(&mut driver, b"defghij").unwrap();
        assert_eq!(b.chunks_written(), 2);
        assert_eq!(b.pending_len(), 2);

        let chunks = driver.docs("test.fs.chunks");
        assert_eq!(chunks[0].get_i32("n").unwrap(), 0);
        assert_eq!(chunks[0].get_binary_generic("data").unwrap(), &b"abcd".to_vec());
        assert_eq!(chunks[1].get_binary_generic("data").unwrap(), &b"efgh".to_vec());
        assert_eq!(chunks[1].get_object_id("files_id").unwrap(), b.file_id());
    }

    #[test]
    fn test_build_file() {
        let mut driver = MemoryDriver::new();
        let mut b = builder(4);
        let first_id = b.file_id();
        b.append(&mut driver, b"0123456789").unwrap();
        let file = b.build_file(&mut driver, "notes.txt", Some("text/plain")).unwrap();

        // ceil(10 / 4) 个块
        let chunks = driver.docs("test.fs.chunks");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].get_binary_generic("data").unwrap(), &b"89".to_vec());

        let files = driver.docs("test.fs.files");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].get_i32("length").unwrap(), 10);
        assert_eq!(files[0].get_i32("chunkSize").unwrap(), 4);
        assert_eq!(files[0].get_str("md5").unwrap(), FAKE_MD5);
        assert_eq!(files[0].get_str("contentType").unwrap(), "text/plain");

        let (database, command) = &driver.commands[0];
        assert_eq!(database, "test");
        assert_eq!(command.get_object_id("filemd5").unwrap(), first_id);
        assert_eq!(command.get_str("root").unwrap(), "fs");

        let file = file.as_table().unwrap();
        assert_eq!(file.get("filename"), Value::from("notes.txt"));
        assert_eq!(file.get("length"), Value::Number(10.0));
        assert_eq!(
            file.get("_id").as_rich().unwrap().value(),
            RichValue::ObjectId(Some(first_id.to_hex()))
        );

        // 重置为新文件
        assert_ne!(b.file_id(), first_id);
        assert_eq!(b.chunks_written(), 0);
    }

    #[test]
    fn test_empty_file() {
        let mut driver = MemoryDriver::new();
        let mut b = builder(4);
        b.build_file(&mut driver, "empty", None).unwrap();
        assert!(driver.docs("test.fs.chunks").is_empty());
        let files = driver.docs("test.fs.files");
        assert_eq!(files[0].get_i32("length").unwrap(), 0);
        assert!(!files[0].contains_key("contentType"));
    }

    #[test]
    fn test_exact_multiple_has_no_tail() {
        let mut driver = MemoryDriver::new();
        let mut b = builder(4);
        b.append(&mut driver, b"abcdefgh").unwrap();
        assert_eq!(b.pending_len(), 0);
        b.build_file(&mut driver, "eight", Some("")).unwrap();
        assert_eq!(driver.docs("test.fs.chunks").len(), 2);
        assert!(!driver.docs("test.fs.files")[0].contains_key("contentType"));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(GridFileBuilder::new("test", 0, "fs", Codec::default()).is_err());
        assert!(GridFileBuilder::new("test", MAX_CHUNK_SIZE + 1, "fs", Codec::default()).is_err());
        assert!(GridFileBuilder::new("test", i32::MAX as usize + 1, "fs", Codec::default()).is_err());
        assert!(GridFileBuilder::new("test", MAX_CHUNK_SIZE, "fs", Codec::default()).is_ok());
        assert!(GridFileBuilder::new("bad.db", 4, "fs", Codec::default()).is_err());
    }

    #[test]
    fn test_builder_from_client_config() {
        let mut db = DbClient::new(MemoryDriver::new());
        let mut b = db.grid_file_builder("media").unwrap();
        b.append(db.driver_mut(), &[7u8; 10]).unwrap();
        assert_eq!(b.chunks_written(), 0);
        assert_eq!(b.pending_len(), 10);
        b.build_file(db.driver_mut(), "small.bin", None).unwrap();
        assert_eq!(db.driver().docs("media.fs.chunks").len(), 1);
        assert_eq!(db.driver().docs("media.fs.files")[0].get_i32("chunkSize").unwrap(), 256 * 1024);
    }

    #[test]
    fn test_filemd5_failure() {
        let mut driver = MemoryDriver::new();
        let mut b = builder(4);
        b.append(&mut driver, b"abcdef").unwrap();
        driver.fail_with = Some("lost connection".to_string());
        let err = b.build_file(&mut driver, "x", None).unwrap_err();
        assert!(matches!(err, LuaMongoError::Driver(_)));
    }

    fn grid_fs() -> GridFs {
        GridFs::new("test", "fs", 4, Codec::default()).unwrap()
    }

    #[test]
    fn test_find_file_and_read_back() {
        let mut driver = MemoryDriver::new();
        let fs = grid_fs();
        fs.store_data(&mut driver, b"0123456789", "digits.txt", Some("text/plain")).unwrap();

        let file = fs.find_file(&mut driver, "digits.txt").unwrap();
        assert!(file.exists());
        assert_eq!(file.filename(), "digits.txt");
        assert_eq!(file.md5(), FAKE_MD5);
        assert_eq!(file.chunk_size(), 4);
        assert_eq!(file.content_length(), 10);
        assert_eq!(file.num_chunks(), 3);
        assert_eq!(file.field("contentType").unwrap(), Value::from("text/plain"));
        assert_eq!(file.field("missing").unwrap(), Value::Nil);
        assert_eq!(file.metadata().unwrap(), Value::Nil);
        assert_eq!(
            file.upload_date().unwrap().as_rich().unwrap().kind(),
            luamongo_codec::RichKind::Date
        );

        let last = file.chunk(&mut driver, 2).unwrap();
        assert_eq!(last.n(), 2);
        assert_eq!(last.data(), b"89");
        assert_eq!(last.len(), 2);
        assert!(file.chunk(&mut driver, 3).is_err());

        assert_eq!(file.data(&mut driver).unwrap(), b"0123456789".to_vec());
    }

    #[test]
    fn test_data_orders_chunks() {
        let mut driver = MemoryDriver::new();
        let fs = grid_fs();
        fs.store_data(&mut driver, b"abcdefgh", "ab", None).unwrap();
        driver.collections.get_mut("test.fs.chunks").unwrap().reverse();
        let file = fs.find_file(&mut driver, "ab").unwrap();
        assert_eq!(file.data(&mut driver).unwrap(), b"abcdefgh".to_vec());
    }

    #[test]
    fn test_missing_chunk_is_error() {
        let mut driver = MemoryDriver::new();
        let fs = grid_fs();
        fs.store_data(&mut driver, b"abcdefgh", "ab", None).unwrap();
        driver.collections.get_mut("test.fs.chunks").unwrap().pop();
        let file = fs.find_file(&mut driver, "ab").unwrap();
        assert!(matches!(file.data(&mut driver), Err(LuaMongoError::GridFs(_))));
        assert!(file.chunk(&mut driver, 1).is_err());
    }

    #[test]
    fn test_find_missing_file() {
        let mut driver = MemoryDriver::new();
        let file = grid_fs().find_file(&mut driver, "nope").unwrap();
        assert!(!file.exists());
        assert_eq!(file.filename(), "");
        assert_eq!(file.content_length(), 0);
        assert_eq!(file.num_chunks(), 0);
        assert!(file.data(&mut driver).is_err());
    }

    #[test]
    fn test_list_and_remove_file() {
        let mut driver = MemoryDriver::new();
        let fs = grid_fs();
        fs.store_data(&mut driver, b"one", "a", None).unwrap();
        fs.store_data(&mut driver, b"two two", "b", None).unwrap();

        let mut cursor = fs.list(&mut driver).unwrap();
        assert_eq!(cursor.namespace().to_string(), "test.fs.files");
        let names: Vec<Value> = cursor
            .rows()
            .map(|row| row.unwrap().as_table().unwrap().get("filename"))
            .collect();
        assert_eq!(names, vec![Value::from("a"), Value::from("b")]);

        fs.remove_file(&mut driver, "b").unwrap();
        assert_eq!(driver.docs("test.fs.files").len(), 1);
        assert_eq!(driver.docs("test.fs.chunks").len(), 1);
        assert!(!fs.find_file(&mut driver, "b").unwrap().exists());
        assert_eq!(fs.find_file(&mut driver, "a").unwrap().data(&mut driver).unwrap(), b"one".to_vec());
    }

    #[test]
    fn test_store_and_write_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.bin");
        std::fs::write(&source, [1u8, 2, 3, 4, 5, 6]).unwrap();

        let mut driver = MemoryDriver::new();
        let fs = grid_fs();
        let stored = fs.store_file(&mut driver, &source, Some("remote.bin"), None).unwrap();
        assert_eq!(stored.as_table().unwrap().get("filename"), Value::from("remote.bin"));

        let local = fs.store_file(&mut driver, &source, Some(""), None).unwrap();
        let local_name = source.to_string_lossy().to_string();
        assert_eq!(local.as_table().unwrap().get("filename"), Value::from(local_name.as_str()));

        let target = dir.path().join("target.bin");
        let file = fs.find_file(&mut driver, "remote.bin").unwrap();
        assert_eq!(file.write(&mut driver, &target).unwrap(), 6);
        assert_eq!(std::fs::read(&target).unwrap(), vec![1u8, 2, 3, 4, 5, 6]);

        let missing = dir.path().join("missing.bin");
        assert!(matches!(
            fs.store_file(&mut driver, &missing, None, None),
            Err(LuaMongoError::Io(_))
        ));
    }

    #[test]
    fn test_grid_fs_from_client() {
        let mut db = DbClient::new(MemoryDriver::new());
        let fs = db.grid_fs("media", None).unwrap();
        assert_eq!(fs.files_namespace().to_string(), "media.fs.files");
        let custom = db.grid_fs("media", Some("img")).unwrap();
        assert_eq!(custom.chunks_namespace().to_string(), "media.img.chunks");
        assert!(db.grid_fs("bad.db", None).is_err());

        fs.store_data(db.driver_mut(), b"x", "x", None).unwrap();
        let file = fs.find_file(db.driver_mut(), "x").unwrap();
        assert_eq!(file.chunk_size(), 256 * 1024);
        assert_eq!(file.num_chunks(), 1);
    }

    #[test]
    fn test_chunk_lengths_stored_as_double() {
        let mut driver = MemoryDriver::new();
        let id = ObjectId::new();
        driver.collections.insert(
            "test.fs.files".to_string(),
            vec![doc! { "_id": id, "filename": "d", "length": 5.0, "chunkSize": 2.0 }],
        );
        let file = grid_fs().find_file(&mut driver, "d").unwrap();
        assert_eq!(file.content_length(), 5);
        assert_eq!(file.num_chunks(), 3);
    }
}
