//! 传输状态缓存
//!
//! 单槽记录，只保存最近一次完成的上传。服务端写入、桌面端读取，
//! 新上传直接覆盖旧记录（后写者胜），没有队列也没有历史。

use log::debug;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 识别为文本的扩展名
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md"];

/// 识别为无损图片（手绘）的扩展名
const LOSSLESS_IMAGE_EXTENSIONS: &[&str] = &["png", "bmp", "tif", "tiff"];

/// 传输类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Text,
    Draw,
    File,
    Files,
}

impl TransferKind {
    /// 根据一次上传保存下来的文件名分类
    ///
    /// 没有文件时返回 `None`。
    pub fn classify(names: &[String]) -> Option<Self> {
        match names {
            [] => None,
            [single] => {
                let ext = Path::new(single)
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                if TEXT_EXTENSIONS.contains(&ext.as_str()) {
                    Some(TransferKind::Text)
                } else if LOSSLESS_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                    Some(TransferKind::Draw)
                } else {
                    Some(TransferKind::File)
                }
            }
            _ => Some(TransferKind::Files),
        }
    }
}

/// 最近一次完成的上传
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub kind: TransferKind,
    pub names: Vec<String>,
}

impl TransferRecord {
    /// 按分类规则构造记录，没有文件时返回 `None`
    pub fn from_saved(names: Vec<String>) -> Option<Self> {
        TransferKind::classify(&names).map(|kind| Self { kind, names })
    }
}

/// 传输状态缓存
///
/// 所有读写都经过同一把互斥锁，读者只会看到完整的旧记录或完整的新记录。
#[derive(Debug, Default)]
pub struct TransferStateCache {
    slot: Mutex<Option<TransferRecord>>,
}

impl TransferStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<TransferRecord>> {
        // 记录只做整体替换，中毒后的值依旧完整
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 替换当前记录，`None` 表示清空
    pub fn publish(&self, record: Option<TransferRecord>) {
        debug!("Publishing transfer record: {:?}", record);
        *self.lock() = record;
    }

    /// 对一批已保存的文件分类并发布
    ///
    /// 空批次会清空当前记录。
    pub fn publish_saved(&self, names: Vec<String>) -> Option<TransferRecord> {
        let record = TransferRecord::from_saved(names);
        self.publish(record.clone());
        record
    }

    /// 读取当前记录的快照
    pub fn peek(&self) -> Option<TransferRecord> {
        self.lock().clone()
    }

    /// 取出并清空当前记录
    pub fn take(&self) -> Option<TransferRecord> {
        self.lock().take()
    }

    pub fn clear(&self) {
        self.publish(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(TransferKind::classify(&[]), None);
        assert_eq!(
            TransferKind::classify(&names(&["notes.txt"])),
            Some(TransferKind::Text)
        );
        assert_eq!(
            TransferKind::classify(&names(&["NOTES.TXT"])),
            Some(TransferKind::Text)
        );
        assert_eq!(
            TransferKind::classify(&names(&["sign.png"])),
            Some(TransferKind::Draw)
        );
        assert_eq!(
            TransferKind::classify(&names(&["photo.jpg"])),
            Some(TransferKind::File)
        );
        assert_eq!(
            TransferKind::classify(&names(&["Makefile"])),
            Some(TransferKind::File)
        );
        assert_eq!(
            TransferKind::classify(&names(&["a.txt", "b.png", "c.pdf"])),
            Some(TransferKind::Files)
        );
    }

    #[test]
    fn test_record_json_shape() {
        let record = TransferRecord::from_saved(names(&["notes.txt"])).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "text", "names": ["notes.txt"]})
        );
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = TransferStateCache::new();
        cache.publish_saved(names(&["a.png"]));
        cache.publish_saved(names(&["b.png"]));

        let record = cache.peek().unwrap();
        assert_eq!(record.kind, TransferKind::Draw);
        assert_eq!(record.names, names(&["b.png"]));
    }

    #[test]
    fn test_empty_batch_clears() {
        let cache = TransferStateCache::new();
        cache.publish_saved(names(&["a.txt"]));
        assert!(cache.publish_saved(Vec::new()).is_none());
        assert!(cache.peek().is_none());
    }

    #[test]
    fn test_take_clears_slot() {
        let cache = TransferStateCache::new();
        cache.publish_saved(names(&["a.txt"]));
        assert!(cache.take().is_some());
        assert!(cache.peek().is_none());
    }

    #[test]
    fn test_concurrent_peek_never_sees_mixed_record() {
        let cache = Arc::new(TransferStateCache::new());
        let single = TransferRecord::from_saved(names(&["one.txt"])).unwrap();
        let batch = TransferRecord::from_saved(names(&["x.bin", "y.bin", "z.bin"])).unwrap();

        let writer = {
            let cache = cache.clone();
            let (single, batch) = (single.clone(), batch.clone());
            std::thread::spawn(move || {
                for i in 0..2000 {
                    let next = if i % 2 == 0 { &single } else { &batch };
                    cache.publish(Some(next.clone()));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let (single, batch) = (single.clone(), batch.clone());
                std::thread::spawn(move || {
                    for _ in 0..2000 {
                        if let Some(seen) = cache.peek() {
                            assert!(seen == single || seen == batch, "mixed: {:?}", seen);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
