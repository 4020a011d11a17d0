//! 外部工具探测

use log::debug;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// 工具注册表
///
/// 导出流水线只关心某个工具当前是否可用。
pub trait ToolRegistry: Send + Sync {
    fn available(&self, tool_key: &str) -> bool;
}

/// 在 `PATH` 中查找可执行文件
#[derive(Debug, Clone, Default)]
pub struct PathToolRegistry {
    search_path: Option<OsString>,
}

impl PathToolRegistry {
    /// 使用进程的 `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定的搜索目录
    pub fn with_dirs(dirs: &[PathBuf]) -> Self {
        Self {
            search_path: std::env::join_paths(dirs).ok(),
        }
    }

    /// 返回工具的完整路径
    pub fn locate(&self, tool_key: &str) -> Option<PathBuf> {
        let key = Path::new(tool_key);
        if key.components().count() > 1 {
            return is_executable(key).then(|| key.to_path_buf());
        }

        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"))?;
        std::env::split_paths(&search_path)
            .flat_map(|dir| candidates(tool_key).into_iter().map(move |n| dir.join(n)))
            .find(|p| is_executable(p))
    }
}

impl ToolRegistry for PathToolRegistry {
    fn available(&self, tool_key: &str) -> bool {
        let found = self.locate(tool_key);
        debug!("Tool '{}' located at {:?}", tool_key, found);
        found.is_some()
    }
}

fn candidates(tool_key: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![format!("{}.exe", tool_key), tool_key.to_string()]
    } else {
        vec![tool_key.to_string()]
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = PathToolRegistry::with_dirs(&[tmp.path().to_path_buf()]);
        assert!(!registry.available("potrace"));
    }

    #[cfg(unix)]
    #[test]
    fn test_finds_executable_in_search_dirs() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let tool = tmp.path().join("potrace");
        std::fs::write(&tool, "#!/bin/sh\nexit 0\n").unwrap();

        let registry = PathToolRegistry::with_dirs(&[tmp.path().to_path_buf()]);
        // 没有执行权限时不算可用
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!registry.available("potrace"));

        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(registry.available("potrace"));
        assert_eq!(registry.locate("potrace"), Some(tool.clone()));
        assert!(registry.available(tool.to_str().unwrap()));
    }
}
