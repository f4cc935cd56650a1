pub mod args;
pub mod cursor;
pub mod dbclient;
pub mod driver;
pub mod gridfs;
pub mod query;
pub mod result;

pub use luamongo_codec as codec;
pub use luamongo_common as common;

pub use args::DocumentArg;
pub use cursor::{Cursor, Rows, CURSOR_TYPE_NAME};
pub use dbclient::{DbClient, FindOptions, CONNECTION_TYPE_NAME};
pub use driver::{command_ok, Driver, QueryRequest};
pub use gridfs::{
    GridFile, GridFileBuilder, GridFs, GridFsChunk, GRIDFILE_TYPE_NAME, GRIDFSCHUNK_TYPE_NAME, GRIDFS_TYPE_NAME,
};
pub use query::{Query, QueryArg, QueryOptions};
pub use result::{call_result, error_message, CallResult, Operation};

pub use codec::{Codec, CodecError, Table, Value};
pub use common::logging::{init_logging, init_logging_with};
pub use common::{LuaMongoError, LuaMongoResult, Namespace, ROOT_NAMESPACE};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
