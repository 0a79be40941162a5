/// 以 u32 为组的位图，首次适配分配
#[derive(Debug)]
pub struct Bitmap<'a>(&'a mut [u32]);

impl<'a> Bitmap<'a> {
    #[inline]
    pub fn new(words: &'a mut [u32]) -> Self {
        Self(words)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.0.len() * 32
    }

    /// 找出最低的空闲位并置位，返回其序号；位图满时返回空
    pub fn alloc(&mut self) -> Option<usize> {
        let (group_index, ingroup_index) = self
            .0
            .iter()
            .enumerate()
            .find_map(|(group_index, &bits)| {
                (bits != u32::MAX).then_some((group_index, bits.trailing_ones()))
            })?;

        self.0[group_index] |= 1 << ingroup_index;
        Some(group_index * 32 + ingroup_index as usize)
    }

    /// 直接置位，格式化时保留编号用
    pub fn set(&mut self, bit: usize) {
        self.0[bit / 32] |= 1 << (bit % 32);
    }

    pub fn is_set(&self, bit: usize) -> bool {
        self.0
            .get(bit / 32)
            .is_some_and(|&bits| bits & (1 << (bit % 32)) != 0)
    }

    /// 已分配的位数
    pub fn count(&self) -> usize {
        self.0.iter().map(|bits| bits.count_ones() as usize).sum()
    }
}
