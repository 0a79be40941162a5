//! 磁盘请求队列

use alloc::collections::VecDeque;

/// 先进先出的请求队列，队首即正在由硬件处理的请求
#[derive(Debug)]
pub struct RequestQueue<T> {
    inner: VecDeque<T>,
}

impl<T> RequestQueue<T> {
    pub const fn new() -> Self {
        Self {
            inner: VecDeque::new(),
        }
    }

    #[inline]
    pub fn enq(&mut self, request: T) {
        self.inner.push_back(request);
    }

    #[inline]
    pub fn deq(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.inner.front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
