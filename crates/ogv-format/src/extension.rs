//! 扩展名与 MIME 类型规范化.
//!
//! 注册表键由 `(扩展名, MIME 类型)` 组成:
//! - 扩展名必须以 `.` 开头, 统一转为小写后比较
//! - MIME 类型不能为空, 按原样精确匹配

use ogv_core::{OgvError, OgvResult};

/// 扩展名分隔符
pub const EXTENSION_DELIMITER: char = '.';

/// 注册表查找键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey {
    /// 小写扩展名 (含前导 `.`)
    pub extension: String,
    /// MIME 类型
    pub mime_type: String,
}

impl HandlerKey {
    /// 校验并构造查找键
    pub fn new(extension: &str, mime_type: &str) -> OgvResult<Self> {
        Ok(Self {
            extension: normalize_extension(extension)?,
            mime_type: validate_mime_type(mime_type)?.to_string(),
        })
    }
}

/// 规范化扩展名
///
/// 要求以 `.` 开头且 `.` 之后至少有一个字符, 返回小写形式.
pub fn normalize_extension(extension: &str) -> OgvResult<String> {
    let Some(rest) = extension.strip_prefix(EXTENSION_DELIMITER) else {
        return Err(OgvError::InvalidArgument(format!(
            "扩展名必须以 '.' 开头: {extension:?}"
        )));
    };
    if rest.is_empty() || rest.contains(['/', '\\']) {
        return Err(OgvError::InvalidArgument(format!(
            "无效的扩展名: {extension:?}"
        )));
    }
    Ok(extension.to_lowercase())
}

/// 校验 MIME 类型非空
pub fn validate_mime_type(mime_type: &str) -> OgvResult<&str> {
    if mime_type.trim().is_empty() {
        return Err(OgvError::InvalidArgument("MIME 类型不能为空".into()));
    }
    Ok(mime_type)
}

/// 从 URI 或文件路径中提取扩展名
///
/// 忽略查询串与片段, 只看最后一个路径段. 返回小写且含 `.` 的扩展名.
pub fn extension_from_uri(uri: &str) -> Option<String> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let file_name = path.rsplit(['/', '\\']).next()?;
    let (stem, ext) = file_name.rsplit_once(EXTENSION_DELIMITER)?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extension_lowercases() {
        assert_eq!(normalize_extension(".OGV").unwrap(), ".ogv");
        assert_eq!(normalize_extension(".ogv").unwrap(), ".ogv");
    }

    #[test]
    fn test_normalize_extension_rejects_missing_delimiter() {
        assert!(matches!(
            normalize_extension("ogv"),
            Err(OgvError::InvalidArgument(_))
        ));
        assert!(matches!(
            normalize_extension("."),
            Err(OgvError::InvalidArgument(_))
        ));
        assert!(matches!(
            normalize_extension(""),
            Err(OgvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_mime_type_rejects_empty() {
        assert!(validate_mime_type("video/ogg").is_ok());
        assert!(matches!(
            validate_mime_type(""),
            Err(OgvError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_mime_type("   "),
            Err(OgvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_extension_from_uri() {
        assert_eq!(
            extension_from_uri("/media/sharks.ogv").as_deref(),
            Some(".ogv")
        );
        assert_eq!(
            extension_from_uri("http://host/a/b.MP4?x=1#t=3").as_deref(),
            Some(".mp4")
        );
        assert_eq!(extension_from_uri("/media.d/noext"), None);
        assert_eq!(extension_from_uri("/media/.hidden"), None);
        assert_eq!(extension_from_uri("C:\\clips\\a.OGG").as_deref(), Some(".ogg"));
    }
}
