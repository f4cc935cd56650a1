//! 游标模块
//!
//! 缓存驱动返回的文档，按需逐个解码为动态值。

use bson::Document;
use luamongo_codec::{Codec, Value};
use luamongo_common::{LuaMongoResult, Namespace};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static CURSOR_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub const CURSOR_TYPE_NAME: &str = "mongo.Cursor";

pub struct Cursor {
    id: u64,
    namespace: Namespace,
    buffer: VecDeque<Document>,
    codec: Codec,
    total_returned: u64,
}

impl Cursor {
    pub fn new(namespace: Namespace, docs: Vec<Document>, codec: Codec) -> Self {
        let id = CURSOR_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
        trace!(id, ns = %namespace, buffered = docs.len(), "cursor created");
        Self {
            id,
            namespace,
            buffer: docs.into(),
            codec,
            total_returned: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn total_returned(&self) -> u64 {
        self.total_returned
    }

    pub fn is_exhausted(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 取出下一个原始文档
    pub fn next_document(&mut self) -> Option<Document> {
        let doc = self.buffer.pop_front()?;
        self.total_returned += 1;
        Some(doc)
    }

    /// 取出并解码下一个文档
    ///
    /// # Returns
    /// 游标耗尽时返回 `Ok(None)`；空文档解码为 `Some(Value::Nil)`
    pub fn next(&mut self) -> LuaMongoResult<Option<Value>> {
        match self.next_document() {
            Some(doc) => Ok(Some(self.codec.decode(&doc)?)),
            None => Ok(None),
        }
    }

    /// 逐行迭代解码结果
    pub fn rows(&mut self) -> Rows<'_> {
        Rows { cursor: self }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#x}", CURSOR_TYPE_NAME, self.id)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("buffered", &self.buffer.len())
            .field("total_returned", &self.total_returned)
            .finish()
    }
}

pub struct Rows<'a> {
    cursor: &'a mut Cursor,
}

impl Iterator for Rows<'_> {
    type Item = LuaMongoResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next().transpose()
    }
}
