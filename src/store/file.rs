/// 基于文件目录的本地存储
///
/// 每个键对应目录下的一个 JSON 文件，文件名为键的 base64（URL 安全）编码，
/// 避免 `:` 等字符在 Windows 文件名中非法。
/// 写入先落盘到临时文件再 rename，保证读者不会看到写了一半的记录。
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{LocalStore, StoreError, StoredRecord};

/// 记录文件扩展名
const RECORD_EXT: &str = ".json";

/// 文件目录存储
pub struct FileStore {
    dir: PathBuf,

    /// 临时文件序号（同进程内多个写者互不覆盖临时文件）
    seq: AtomicU64,
}

impl FileStore {
    /// 打开（必要时创建）存储目录
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        tracing::debug!("本地缓存目录: {}", dir.display());

        Ok(Self {
            dir,
            seq: AtomicU64::new(0),
        })
    }

    /// 存储目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(key: &str) -> String {
        format!("{}{}", URL_SAFE_NO_PAD.encode(key), RECORD_EXT)
    }

    fn key_from_file_name(name: &str) -> Option<String> {
        let encoded = name.strip_suffix(RECORD_EXT)?;
        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(Self::file_name(key))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{}.tmp",
            URL_SAFE_NO_PAD.encode(key),
            std::process::id(),
            seq
        ))
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(&record)?;
        let tmp = self.temp_path_for(&record.key);

        let written = match tokio::fs::write(&tmp, &bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, self.path_for(&record.key)).await,
            Err(e) => Err(e),
        };

        // 写了一半或替换失败，都不能留下临时文件
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            // 跳过写入中的临时文件
            if name.starts_with('.') {
                continue;
            }

            let Some(key) = Self::key_from_file_name(name) else {
                continue;
            };

            if key.starts_with(prefix) {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(removed)
    }
}
