//! 注册表所用的定长桶哈希表
//!
//! 桶数固定为 [`BUCKET_CAPACITY`]，冲突以链表串联，新项插在链首。
//! 哈希与判等由调用方通过 [`BuildHasher`] 与 [`Eq`] 提供。

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};

pub const BUCKET_CAPACITY: usize = 256;

/// 逐字节累加的哈希，分布不佳，但注册表很小
#[derive(Debug, Default, Clone, Copy)]
pub struct AdditiveHasher(u64);

impl Hasher for AdditiveHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |h, &byte| h.wrapping_add(byte as u64));
    }
}

pub type AdditiveState = BuildHasherDefault<AdditiveHasher>;

#[derive(Debug, Clone)]
pub struct BucketMap<K, V, S = AdditiveState> {
    buckets: Vec<VecDeque<(K, V)>>,
    len: usize,
    hasher: S,
}

impl<K, V> BucketMap<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(AdditiveState::default())
    }
}

impl<K, V> Default for BucketMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> BucketMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            buckets: (0..BUCKET_CAPACITY).map(|_| VecDeque::new()).collect(),
            len: 0,
            hasher,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 按桶序、链序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter().map(|(k, v)| (k, v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<K, V, S> BucketMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn bucket<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        (self.hasher.hash_one(key) % BUCKET_CAPACITY as u64) as usize
    }

    /// 插入键值；键已存在时替换并返回旧值，表长不变
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let pos = self.bucket(&key);
        let chain = &mut self.buckets[pos];

        if let Some((_, old)) = chain.iter_mut().find(|(k, _)| *k == key) {
            return Some(core::mem::replace(old, value));
        }

        chain.push_front((key, value));
        self.len += 1;
        None
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.buckets[self.bucket(key)]
            .iter()
            .find_map(|(k, v)| (k.borrow() == key).then_some(v))
    }

    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }
}
