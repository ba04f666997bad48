//! 存储位置的准备工作

use std::path::Path;

use freshd_core::{FreshdError, FreshdResult};
use tracing::debug;

/// 确保存储文件所在目录存在
pub fn provision_storage(path: &str) -> FreshdResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FreshdError::config_error(format!("创建存储目录失败 {}: {e}", parent.display()))
            })?;
            debug!("存储目录就绪: {}", parent.display());
        }
    }
    Ok(())
}

/// 由文件路径构造SQLite连接URL
pub fn sqlite_url(path: &str) -> String {
    format!("sqlite:{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/freshd.db");
        provision_storage(path.to_str().unwrap()).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_provision_bare_filename_is_noop() {
        provision_storage("freshd.db").unwrap();
    }

    #[test]
    fn test_sqlite_url() {
        assert_eq!(sqlite_url("/tmp/x.db"), "sqlite:/tmp/x.db");
    }
}
