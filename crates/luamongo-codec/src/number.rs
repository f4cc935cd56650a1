//! 数值与类型工具
//!
//! - `format_number`: 宿主的数字转字符串规则 (`%.14g`)
//! - `to_number`: 宽松的数值转换，失败时返回 `None` 而不是报错
//! - `type_of`: 扩展类型返回 `mongo.<Name>`，否则返回基础类型名

use crate::value::Value;

const PRECISION: i32 = 14;

/// 按 `%.14g` 格式化数字
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // 先按科学计数法取得舍入后的指数
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp) as usize;
        strip_zeros(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// 宽松的数值转换
///
/// # Arguments
/// * `value` - 待转换的值
/// * `base` - 进制；`None` 或 10 时数字和数值型扩展载荷直接返回，字符串按十进制
///   (或 `0x` 前缀十六进制) 解析；2..=36 时把字符串 (或数字的字符串形式)
///   按该进制解析为整数
///
/// # Returns
/// 转换结果，无法转换时返回 `None`
pub fn to_number(value: &Value, base: Option<u32>) -> Option<f64> {
    match base {
        None | Some(10) => match value {
            Value::Number(n) => Some(*n),
            Value::Rich(r) => r.value().numeric_payload(),
            Value::String(s) => parse_decimal(std::str::from_utf8(s).ok()?),
            _ => None,
        },
        Some(base) if (2..=36).contains(&base) => {
            let text = match value {
                Value::String(s) => std::str::from_utf8(s).ok()?.to_string(),
                Value::Number(n) => format_number(*n),
                _ => return None,
            };
            parse_radix(text.trim(), base)
        }
        Some(_) => None,
    }
}

fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        let n = u64::from_str_radix(hex, 16).ok()? as f64;
        return Some(if negative { -n } else { n });
    }
    // 拒绝 inf / nan 等 Rust 能解析但宿主不接受的写法
    if text.is_empty() || text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    text.parse::<f64>().ok()
}

fn parse_radix(text: &str, base: u32) -> Option<f64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() || digits.starts_with('+') {
        return None;
    }
    let n = u64::from_str_radix(digits, base).ok()? as f64;
    Some(if negative { -n } else { n })
}

/// 类型自省
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Rich(r) => r.kind().qualified_name(),
        other => other.kind_name(),
    }
}
