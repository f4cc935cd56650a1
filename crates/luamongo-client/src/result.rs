//! 宿主侧的错误返回约定
//!
//! 宿主函数失败时不抛异常，而是返回 `(nil, message)`；成功时返回 `(value, nil)`。

use luamongo_common::{LuaMongoError, LuaMongoResult};
use tracing::warn;

/// `(结果, 错误信息)` 对
pub type CallResult<T> = (Option<T>, Option<String>);

/// 失败的操作，决定错误信息的前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Query,
    Insert,
    Count,
    Remove,
    Update,
    FindOne,
    /// 其它方法：`(对象类型, 方法名)`
    Call(&'static str, &'static str),
}

impl Operation {
    pub fn failure_message(&self, detail: &str) -> String {
        match self {
            Operation::Connect => format!("Connection failed: {}", detail),
            Operation::Query => format!("Query failed: {}", detail),
            Operation::Insert => format!("Insert failed: {}", detail),
            Operation::Count => format!("Count failed: {}", detail),
            Operation::Remove => format!("Remove failed: {}", detail),
            Operation::Update => format!("Update failed: {}", detail),
            Operation::FindOne => format!("FindOne failed: {}", detail),
            Operation::Call(object, method) => {
                format!("Error calling {}:{}(): {}", object, method, detail)
            }
        }
    }
}

/// 宿主侧的错误信息
///
/// 参数错误原样返回，其它错误加上操作前缀
pub fn error_message(op: Operation, err: &LuaMongoError) -> String {
    match err {
        LuaMongoError::InvalidArgument(msg) => msg.clone(),
        other => op.failure_message(&other.to_string()),
    }
}

/// 把 `Result` 转为 `(结果, 错误信息)` 对
pub fn call_result<T>(op: Operation, result: LuaMongoResult<T>) -> CallResult<T> {
    match result {
        Ok(value) => (Some(value), None),
        Err(err) => {
            let message = error_message(op, &err);
            warn!(?op, %message, "call failed");
            (None, Some(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luamongo_codec::CodecError;

    #[test]
    fn test_success() {
        assert_eq!(call_result(Operation::Insert, Ok(true)), (Some(true), None));
    }

    #[test]
    fn test_prefixed_failures() {
        let err: LuaMongoError = CodecError::UnsupportedDynamicType("function".to_string()).into();
        let (value, message) = call_result::<bool>(Operation::Insert, Err(err));
        assert!(value.is_none());
        assert_eq!(message.as_deref(), Some("Insert failed: Unsupported Lua type `function'"));

        let err = LuaMongoError::Driver("socket closed".to_string());
        assert_eq!(
            error_message(Operation::Query, &err),
            "Query failed: Driver error: socket closed"
        );
        assert_eq!(
            error_message(Operation::Call(crate::dbclient::CONNECTION_TYPE_NAME, "ensure_index"), &err),
            "Error calling mongo.Connection:ensure_index(): Driver error: socket closed"
        );
    }

    #[test]
    fn test_gridfs_call_failures() {
        let err = LuaMongoError::GridFs("file does not exist".to_string());
        assert_eq!(
            error_message(Operation::Call(crate::gridfs::GRIDFILE_TYPE_NAME, "data"), &err),
            "Error calling mongo.GridFile:data(): GridFS error: file does not exist"
        );
        let err = LuaMongoError::Command("ns not found".to_string());
        assert_eq!(
            error_message(Operation::Call(crate::gridfs::GRIDFS_TYPE_NAME, "remove_file"), &err),
            "Error calling mongo.GridFS:remove_file(): Command failed: ns not found"
        );
        assert_eq!(crate::gridfs::GRIDFSCHUNK_TYPE_NAME, "mongo.GridFSChunk");
    }

    #[test]
    fn test_argument_errors_are_not_prefixed() {
        let err = LuaMongoError::InvalidArgument("JSON string or Lua table required".to_string());
        assert_eq!(error_message(Operation::Update, &err), "JSON string or Lua table required");
    }
}
