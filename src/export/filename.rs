//! Имена скачиваемых файлов.

use once_cell::sync::Lazy;
use regex::Regex;

static INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\s\x00-\x1f]+"#).expect("filename pattern is valid"));

/// Безопасное для всех ОС имя файла: нижний регистр, спецсимволы заменены на `_`.
///
/// ```rust
/// use voxstudio::export::sanitize_filename;
/// assert_eq!(sanitize_filename("Hello World"), "hello_world");
/// assert_eq!(sanitize_filename("  "), "");
/// ```
pub fn sanitize_filename(input: &str) -> String {
    let replaced = INVALID_CHARS.replace_all(input.trim(), "_");
    replaced.trim_matches(|c| c == '_' || c == '.').to_lowercase()
}

/// Имя файла экспорта.
///
/// При наличии заголовка используется он, иначе имя по умолчанию,
/// к которому добавляется отметка времени в миллисекундах (если задана).
pub fn export_filename(title: Option<&str>, default_name: &str, extension: &str, timestamp_ms: Option<i64>) -> String {
    let from_title = title.map(sanitize_filename).filter(|t| !t.is_empty());
    let stem = match (from_title, timestamp_ms) {
        (Some(title), _) => title,
        (None, Some(ts)) => format!("{}_{}", sanitize_filename(default_name), ts),
        (None, None) => sanitize_filename(default_name),
    };
    format!("{}.{}", stem, extension.trim_start_matches('.'))
}
