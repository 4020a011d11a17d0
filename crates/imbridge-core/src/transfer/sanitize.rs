//! 文件名清洗
//!
//! 客户端提交的文件名一律视为不可信输入，只保留最后一个路径段。

use crate::error::{BridgeError, Result};

/// 返回客户端文件名的最后一个路径段
///
/// - `/` 和 `\` 都视为分隔符（手机端可能来自任意平台）
/// - 丢弃空段、`.` 和 `..`
/// - 去掉 `C:` 形式的盘符前缀
///
/// 没有剩余内容时返回 [`BridgeError::InvalidName`]。
pub fn sanitize_filename(raw: &str) -> Result<String> {
    if raw.contains('\0') {
        return Err(BridgeError::InvalidName(raw.to_string()));
    }

    let last = raw
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .last()
        .unwrap_or_default();

    let name = strip_drive_prefix(last);
    if name.is_empty() || name == "." || name == ".." {
        return Err(BridgeError::InvalidName(raw.to_string()));
    }

    Ok(name.to_string())
}

fn strip_drive_prefix(segment: &str) -> &str {
    let bytes = segment.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &segment[2..]
    } else {
        segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_unchanged() {
        assert_eq!(sanitize_filename("notes.txt").unwrap(), "notes.txt");
        assert_eq!(sanitize_filename("my photo.png").unwrap(), "my photo.png");
    }

    #[test]
    fn test_strips_traversal_and_roots() {
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("/etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("a/b/../c.txt").unwrap(), "c.txt");
        assert_eq!(sanitize_filename("..\\..\\boot.ini").unwrap(), "boot.ini");
    }

    #[test]
    fn test_strips_drive_prefix() {
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\sig.png").unwrap(),
            "sig.png"
        );
        assert_eq!(sanitize_filename("D:evil.txt").unwrap(), "evil.txt");
    }

    #[test]
    fn test_trailing_separator_uses_last_real_segment() {
        assert_eq!(sanitize_filename("docs/report.pdf/").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename("dir/..").unwrap(), "dir");
    }

    #[test]
    fn test_empty_inputs_are_invalid() {
        for raw in ["", "/", "\\\\", "..", "../..", "./.", "C:", "   ", "a\0b"] {
            assert!(
                matches!(sanitize_filename(raw), Err(BridgeError::InvalidName(_))),
                "expected InvalidName for {:?}",
                raw
            );
        }
    }
}
