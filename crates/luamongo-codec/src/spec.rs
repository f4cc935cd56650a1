use bson::spec::ElementType;

pub use luamongo_common::config::DEFAULT_MAX_DEPTH as MAX_NESTING_DEPTH;

/// 可以精确编码为 Int32 的数字范围
pub const INT32_MIN: f64 = i32::MIN as f64;
pub const INT32_MAX: f64 = i32::MAX as f64;

/// 元素类型在错误信息中使用的名字
pub fn element_type_name(element_type: ElementType) -> &'static str {
    #[allow(unreachable_patterns)]
    match element_type {
        ElementType::Double => "Double",
        ElementType::String => "String",
        ElementType::EmbeddedDocument => "Object",
        ElementType::Array => "Array",
        ElementType::Binary => "BinData",
        ElementType::Undefined => "Undefined",
        ElementType::ObjectId => "ObjectId",
        ElementType::Boolean => "Bool",
        ElementType::DateTime => "Date",
        ElementType::Null => "Null",
        ElementType::RegularExpression => "RegEx",
        ElementType::DbPointer => "DBRef",
        ElementType::JavaScriptCode => "Code",
        ElementType::Symbol => "Symbol",
        ElementType::JavaScriptCodeWithScope => "CodeWithScope",
        ElementType::Int32 => "Int32",
        ElementType::Timestamp => "Timestamp",
        ElementType::Int64 => "Int64",
        ElementType::Decimal128 => "Decimal128",
        ElementType::MaxKey => "MaxKey",
        ElementType::MinKey => "MinKey",
        _ => "Unknown",
    }
}

/// 判断数字能否无损写成 Int32
pub fn fits_int32(n: f64) -> bool {
    n.fract() == 0.0 && (INT32_MIN..=INT32_MAX).contains(&n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_int32() {
        assert!(fits_int32(5.0));
        assert!(fits_int32(-2147483648.0));
        assert!(fits_int32(2147483647.0));
        assert!(!fits_int32(2147483648.0));
        assert!(!fits_int32(5.5));
        assert!(!fits_int32(f64::NAN));
        assert!(!fits_int32(f64::INFINITY));
    }
}
