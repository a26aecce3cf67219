// ==========================================
// 石材车间加工系统 - 规格尺寸解析
// ==========================================
// 红线: 解析是全函数，任何输入都返回有限数值，失败按 0 处理
// ==========================================

/// 解析自由文本尺寸（cm）
///
/// # 参数
/// - `text`: 宽/高文本，允许为空或 None
///
/// # 返回
/// - 可解析的数字返回其值；空、非数字、NaN/inf 返回 0.0
pub fn parse_dimension(text: Option<&str>) -> f64 {
    let Some(raw) = text else {
        return 0.0;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_text() {
        assert_eq!(parse_dimension(Some("120")), 120.0);
        assert_eq!(parse_dimension(Some(" 60.5 ")), 60.5);
        assert_eq!(parse_dimension(Some("-3")), -3.0);
    }

    #[test]
    fn test_garbage_is_zero() {
        assert_eq!(parse_dimension(None), 0.0);
        assert_eq!(parse_dimension(Some("")), 0.0);
        assert_eq!(parse_dimension(Some("   ")), 0.0);
        assert_eq!(parse_dimension(Some("60cm-ish")), 0.0);
        assert_eq!(parse_dimension(Some("12,5")), 0.0);
    }

    #[test]
    fn test_non_finite_is_zero() {
        assert_eq!(parse_dimension(Some("NaN")), 0.0);
        assert_eq!(parse_dimension(Some("inf")), 0.0);
        assert_eq!(parse_dimension(Some("1e400")), 0.0);
    }
}
