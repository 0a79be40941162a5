//! 挂载表
//!
//! 路径按最长前缀匹配到挂载点；前缀须完整匹配，且止于路径分量的边界，
//! 同长者取先注册的挂载点。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::collections::BucketMap;
use crate::FileSystem;

/// 挂载点：文件系统操作表、底层块设备与内存中的超级块
pub struct Mount {
    path: String,
    /// 注册序号，用于同长前缀的裁决
    index: usize,
    fs_name: String,
    fs: Arc<dyn FileSystem>,
    dev: Arc<dyn BlockDevice>,
    /// 对同一文件系统的所有调用都持有此锁，分配与目录修改因此互斥
    sb: Mutex<Box<dyn Any + Send>>,
}

impl fmt::Debug for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mount")
            .field("path", &self.path)
            .field("index", &self.index)
            .field("fs", &self.fs_name)
            .field("partition", &self.dev.partition())
            .finish()
    }
}

impl Mount {
    pub(crate) fn new(
        path: String,
        index: usize,
        fs_name: String,
        fs: Arc<dyn FileSystem>,
        dev: Arc<dyn BlockDevice>,
        sb: Box<dyn Any + Send>,
    ) -> Self {
        Self {
            path,
            index,
            fs_name,
            fs,
            dev,
            sb: Mutex::new(sb),
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn fs_name(&self) -> &str {
        &self.fs_name
    }

    #[inline]
    pub fn block_device(&self) -> &Arc<dyn BlockDevice> {
        &self.dev
    }

    /// 在超级块锁内调用文件系统
    pub fn session<V>(
        &self,
        f: impl FnOnce(&dyn FileSystem, &mut dyn Any, &Arc<dyn BlockDevice>) -> V,
    ) -> V {
        let mut sb = self.sb.lock();
        f(self.fs.as_ref(), sb.as_mut(), &self.dev)
    }
}

#[derive(Debug, Default)]
pub struct MountTable {
    mounts: BucketMap<String, Arc<Mount>>,
    registered: usize,
}

/// 去掉挂载路径末尾的 `/`，根目录除外
pub fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// 同一路径再次挂载时替换旧的绑定，沿用其注册序号
    pub fn insert(
        &mut self,
        path: &str,
        fs_name: &str,
        fs: Arc<dyn FileSystem>,
        dev: Arc<dyn BlockDevice>,
        sb: Box<dyn Any + Send>,
    ) -> Arc<Mount> {
        let path = normalize(path);
        let index = match self.mounts.get(path) {
            Some(old) => old.index,
            None => {
                self.registered += 1;
                self.registered - 1
            }
        };

        let mount = Arc::new(Mount::new(
            String::from(path),
            index,
            String::from(fs_name),
            fs,
            dev,
            sb,
        ));
        self.mounts.put(String::from(path), mount.clone());
        mount
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Mount>> {
        self.mounts.get(normalize(path))
    }

    /// 按注册顺序排列的挂载点
    pub fn ordered(&self) -> Vec<Arc<Mount>> {
        let mut mounts: Vec<_> = self.mounts.values().cloned().collect();
        mounts.sort_by_key(|mount| mount.index);
        mounts
    }

    /// 最长前缀匹配，返回挂载点与相对于它的路径
    pub fn resolve<'p>(&self, path: &'p str) -> Option<(Arc<Mount>, &'p str)> {
        let candidates = self.ordered();
        let keys: Vec<&[u8]> = candidates.iter().map(|m| m.path.as_bytes()).collect();
        let target = path.as_bytes();

        // 每个候选已连续匹配的字符数；一旦失配就不再前进
        let mut counts = alloc::vec![0usize; keys.len()];
        let mut alive = alloc::vec![true; keys.len()];
        for (pos, &ch) in target.iter().enumerate() {
            for (i, key) in keys.iter().enumerate() {
                if !alive[i] {
                    continue;
                }
                if key.get(pos) == Some(&ch) {
                    counts[i] += 1;
                } else {
                    alive[i] = false;
                }
            }
        }

        let mut best: Option<usize> = None;
        for (i, key) in keys.iter().enumerate() {
            let full = counts[i] == key.len();
            let boundary = *key == b"/"
                || target.len() == key.len()
                || target.get(key.len()) == Some(&b'/');
            if !(full && boundary) {
                continue;
            }
            // 严格大于：同长时保留序号更小者
            if best.is_none_or(|b| counts[i] > counts[b]) {
                best = Some(i);
            }
        }

        let winner = best?;
        let mount = candidates[winner].clone();
        let relative = if mount.path == "/" {
            path
        } else {
            &path[mount.path.len()..]
        };
        let relative = if relative.is_empty() { "/" } else { relative };
        log::debug!(
            "resolve {path:?} -> mount {:?}, relative {relative:?}",
            mount.path
        );

        Some((mount, relative))
    }
}
