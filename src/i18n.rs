// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）、西班牙文、中文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言列表
pub const SUPPORTED_LOCALES: [&str; 3] = ["en", "es", "zh-CN"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// 不支持的语言代码会被忽略（保持当前语言），返回是否生效
pub fn set_locale(locale: &str) -> bool {
    if !SUPPORTED_LOCALES.contains(&locale) {
        tracing::warn!("不支持的语言代码: {}，保持 {}", locale, current_locale());
        return false;
    }
    rust_i18n::set_locale(locale);
    true
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use stone_workshop::i18n::t;
/// let msg = t("order.missing_output_product");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，占位符格式 `%{name}`）
///
/// # 示例
/// ```no_run
/// use stone_workshop::i18n::t_with_args;
/// let msg = t_with_args("stock.finalize_failed", &[("picking", "WH/INT/00001"), ("reason", "x")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
