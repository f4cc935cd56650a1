//! 动态值模型
//!
//! 宿主脚本运行时的值表示：nil / boolean / number / string / table，
//! 以及扩展类型包装值 (`Rich`) 和编解码器无法表示的宿主原生类型 (`Host`)。
//!
//! `Table` 是带身份的共享容器 (`Rc<RefCell<..>>`)，与宿主中的 table 一样可以
//! 自引用；编码器依赖 `Table::id()` 做环检测。

use crate::rich::{Rich, RichValue};
use bytes::Bytes;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// 动态值
///
/// # 支持的类型
///
/// - **基础类型**: Nil, Boolean, Number, String (原始字节)
/// - **容器类型**: Table
/// - **扩展类型**: Rich (Date, RegEx, NumberLong 等)
/// - **宿主类型**: Host (function, userdata 等，仅用于报告不支持的类型)
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Number(f64),
    String(Bytes),
    Table(Table),
    Rich(Rich),
    Host(HostKind),
}

/// 编解码器无法表示的宿主原生类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    Function,
    UserData,
    LightUserData,
    Thread,
}

impl HostKind {
    pub fn name(&self) -> &'static str {
        match self {
            HostKind::Function => "function",
            HostKind::UserData => "userdata",
            HostKind::LightUserData => "lightuserdata",
            HostKind::Thread => "thread",
        }
    }
}

impl Value {
    /// 获取宿主层面的基础类型名称
    ///
    /// 扩展类型包装值在宿主中就是 table，因此返回 `"table"`；
    /// 需要扩展类型名时使用 [`crate::number::type_of`]。
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) | Value::Rich(_) => "table",
            Value::Host(kind) => kind.name(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// 宿主语义下的真值：只有 nil 和 false 为假
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// 字符串值且为合法 UTF-8 时返回 `&str`
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_rich(&self) -> Option<&Rich> {
        match self {
            Value::Rich(r) => Some(r),
            _ => None,
        }
    }
}

/// 表按身份比较 (与宿主的 `==` 一致)，扩展类型包装值按载荷比较
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a.ptr_eq(b),
            (Value::Rich(a), Value::Rich(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Bytes::from(v))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::String(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::String(Bytes::from(v))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::String(v)
    }
}

impl From<Table> for Value {
    fn from(v: Table) -> Self {
        Value::Table(v)
    }
}

impl From<Rich> for Value {
    fn from(v: Rich) -> Self {
        Value::Rich(v)
    }
}

impl From<RichValue> for Value {
    fn from(v: RichValue) -> Self {
        Value::Rich(Rich::new(v))
    }
}

impl From<HostKind> for Value {
    fn from(v: HostKind) -> Self {
        Value::Host(v)
    }
}

// ============================================================================
// Table
// ============================================================================

/// 表的身份标识，仅在表存活期间唯一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(usize);

/// 宿主 table
///
/// 克隆得到的是同一张表的另一个引用。键的迭代顺序为插入顺序。
#[derive(Clone, Default)]
pub struct Table(Rc<RefCell<IndexMap<TableKey, Value>>>);

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 1..N 为键创建数组形态的表
    pub fn from_sequence<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let table = Self::new();
        for (i, item) in items.into_iter().enumerate() {
            table.set(i as i64 + 1, item);
        }
        table
    }

    pub fn id(&self) -> TableId {
        TableId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// 键值对数量
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// 数组部分长度：满足 1..=n 全部存在的最大 n
    pub fn sequence_len(&self) -> usize {
        let map = self.0.borrow();
        let mut n = 0;
        while map.contains_key(&TableKey::Integer(n as i64 + 1)) {
            n += 1;
        }
        n
    }

    pub fn get(&self, key: impl Into<TableKey>) -> Value {
        self.0.borrow().get(&key.into()).cloned().unwrap_or(Value::Nil)
    }

    pub fn contains_key(&self, key: impl Into<TableKey>) -> bool {
        self.0.borrow().contains_key(&key.into())
    }

    /// 赋值；赋 nil 等同于删除该键
    pub fn set(&self, key: impl Into<TableKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut map = self.0.borrow_mut();
        if value.is_nil() {
            map.shift_remove(&key);
        } else {
            map.insert(key, value);
        }
    }

    /// 追加到数组部分末尾
    pub fn push(&self, value: impl Into<Value>) {
        let next = self.sequence_len() as i64 + 1;
        self.set(next, value);
    }

    /// 当前键值对的快照，遍历期间不持有借用
    pub fn entries(&self) -> Vec<(TableKey, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<TableKey> {
        self.0.borrow().keys().cloned().collect()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Table {}

impl Hash for Table {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

// 表可能自引用，Debug 只打印身份和大小
impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(map) => write!(f, "Table({:#x}, {} entries)", self.id().0, map.len()),
            Err(_) => write!(f, "Table({:#x})", self.id().0),
        }
    }
}

// ============================================================================
// TableKey
// ============================================================================

/// 非整数浮点键，按位比较
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatKey(u64);

impl FloatKey {
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Debug for FloatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// 表的键
///
/// 整数值的数字键统一规范化为 `Integer`，与宿主行为一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Integer(i64),
    Float(FloatKey),
    String(Bytes),
    Boolean(bool),
    Table(Table),
}

impl TableKey {
    /// 从动态值构造键；nil、扩展类型和宿主类型不能作为键
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(TableKey::from(*n)),
            Value::String(s) => Some(TableKey::String(s.clone())),
            Value::Boolean(b) => Some(TableKey::Boolean(*b)),
            Value::Table(t) => Some(TableKey::Table(t.clone())),
            Value::Nil | Value::Rich(_) | Value::Host(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            TableKey::Integer(i) => Value::Number(*i as f64),
            TableKey::Float(f) => Value::Number(f.value()),
            TableKey::String(s) => Value::String(s.clone()),
            TableKey::Boolean(b) => Value::Boolean(*b),
            TableKey::Table(t) => Value::Table(t.clone()),
        }
    }
}

impl From<f64> for TableKey {
    fn from(n: f64) -> Self {
        if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
            TableKey::Integer(n as i64)
        } else {
            TableKey::Float(FloatKey(n.to_bits()))
        }
    }
}

impl From<i64> for TableKey {
    fn from(i: i64) -> Self {
        TableKey::Integer(i)
    }
}

impl From<i32> for TableKey {
    fn from(i: i32) -> Self {
        TableKey::Integer(i as i64)
    }
}

impl From<usize> for TableKey {
    fn from(i: usize) -> Self {
        TableKey::Integer(i as i64)
    }
}

impl From<&str> for TableKey {
    fn from(s: &str) -> Self {
        TableKey::String(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for TableKey {
    fn from(s: String) -> Self {
        TableKey::String(Bytes::from(s))
    }
}

impl From<Bytes> for TableKey {
    fn from(s: Bytes) -> Self {
        TableKey::String(s)
    }
}

impl From<bool> for TableKey {
    fn from(b: bool) -> Self {
        TableKey::Boolean(b)
    }
}

impl From<Table> for TableKey {
    fn from(t: Table) -> Self {
        TableKey::Table(t)
    }
}

/// 构造 Table 的便捷宏
///
/// ```rust,ignore
/// use luamongo_codec::table;
///
/// let t = table! { "name" => "luamongo", 1 => true };
/// ```
#[macro_export]
macro_rules! table {
    () => {
        $crate::Table::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let t = $crate::Table::new();
        $(
            t.set($key, $value);
        )+
        t
    }};
}
