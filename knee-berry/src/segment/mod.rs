//! 阈值法骨骼分割.
//!
//! 从 CT 扫描按 HU 阈值带提取骨骼候选区域, 再以 6-连通 (钻石) 规则
//! 做连通域分析: 清理小连通域、保留体素数最大的若干个连通域
//! (膝关节场景下即股骨与胫骨).

use crate::consts::gray::*;
use crate::{Area3d, Areas3d, BoneMask, CtScan, NiftiHeaderAttr};
use binary_heap_plus::BinaryHeap;
use ndarray::Array3;
use std::collections::VecDeque;

/// 阈值分割实现块
impl CtScan {
    /// 按 HU 阈值带 `(lower_hu, upper_hu)` (两端均不含) 提取二值骨骼
    /// mask. 返回值复用 `self` 的 header.
    ///
    /// 默认阈值见 [`crate::consts::BONE_HU_LOWER`] 与
    /// [`crate::consts::BONE_HU_UPPER`].
    pub fn threshold_mask(&self, lower_hu: f32, upper_hu: f32) -> BoneMask {
        let data = self
            .data()
            .mapv(|hu| u8::from(hu > lower_hu && hu < upper_hu));
        BoneMask::from_internal(Box::new(self.header().clone()), data)
    }
}

/// 连通域分析实现块
impl BoneMask {
    /// 按 6-连通 (钻石) 规则收集所有骨骼连通域.
    ///
    /// 返回值中每个连通域内的索引按发现顺序存储, 连通域之间按
    /// 第一个体素的行优先序排列.
    pub fn bone_components(&self) -> Areas3d {
        let mut visited = Array3::<bool>::from_elem(self.data().dim(), false);
        let mut ans = Areas3d::new();
        let mut bfs_q = VecDeque::with_capacity(64);

        for (pos, _) in self.data().indexed_iter().filter(|(_, p)| is_bone(**p)) {
            if visited[pos] {
                continue;
            }
            let mut area = Area3d::with_capacity(64);
            visited[pos] = true;
            bfs_q.push_back(pos);
            while let Some(cur) = bfs_q.pop_front() {
                area.push(cur);
                for neigh in self.diamond_neighbours(cur) {
                    if !visited[neigh] && is_bone(self[neigh]) {
                        visited[neigh] = true;
                        bfs_q.push_back(neigh);
                    }
                }
            }
            ans.push(area);
        }
        ans
    }

    /// 清理体素数小于 `min_size` 的骨骼连通域, 返回新 mask.
    pub fn cleaned_components(&self, min_size: usize) -> BoneMask {
        let keep = self
            .bone_components()
            .into_iter()
            .filter(|area| area.len() >= min_size)
            .collect();
        self.from_components(keep)
    }

    /// 仅保留体素数最大的 `n` 个骨骼连通域, 返回新 mask.
    ///
    /// 若连通域总数不足 `n`, 则全部保留. 体素数相同的连通域之间
    /// 保留顺序不作保证.
    pub fn largest_components(&self, n: usize) -> BoneMask {
        // 堆顶为体素数最多的连通域.
        let mut heap: BinaryHeap<Area3d, _> =
            BinaryHeap::new_by(|a: &Area3d, b: &Area3d| a.len().cmp(&b.len()));
        for area in self.bone_components() {
            heap.push(area);
        }

        let mut keep = Areas3d::with_capacity(n);
        while keep.len() < n {
            let Some(area) = heap.pop() else {
                break;
            };
            keep.push(area);
        }
        self.from_components(keep)
    }

    /// 用给定的连通域集合构造与 `self` 同形状的新 mask.
    fn from_components(&self, areas: Areas3d) -> BoneMask {
        let mut data = Array3::<u8>::zeros(self.data().dim());
        for pos in areas.into_iter().flatten() {
            data[pos] = MASK_BONE;
        }
        self.with_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BONE_HU_LOWER, BONE_HU_UPPER};
    use ndarray::{s, Array3};

    #[test]
    fn test_threshold_band_is_strict() {
        // [w, h, z] 布局的合成扫描.
        let mut data = Array3::<f32>::zeros((4, 4, 1));
        data[[0, 0, 0]] = 250.0; // 正好在下界上, 不应入选
        data[[1, 0, 0]] = 250.1;
        data[[2, 0, 0]] = 1200.0;
        data[[3, 0, 0]] = 3000.0; // 正好在上界上, 不应入选
        let scan = CtScan::fake(data, [1.0, 1.0, 1.0]);

        let mask = scan.threshold_mask(BONE_HU_LOWER, BONE_HU_UPPER);
        assert_eq!(mask.bone_count(), 2);
        assert!(is_bone(mask[(0, 0, 1)]));
        assert!(is_bone(mask[(0, 0, 2)]));
    }

    /// 构造三个互不相邻的连通域: 体素数分别为 27, 8, 1.
    fn three_blob_mask() -> BoneMask {
        let mut data = Array3::<u8>::zeros((12, 12, 12));
        data.slice_mut(s![0..3, 0..3, 0..3]).fill(1);
        data.slice_mut(s![6..8, 6..8, 6..8]).fill(1);
        data[[10, 10, 10]] = 1;
        BoneMask::fake(data, [1.0, 1.0, 1.0])
    }

    #[test]
    fn test_bone_components() {
        let mask = three_blob_mask();
        let mut sizes: Vec<usize> = mask.bone_components().iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 8, 27]);
    }

    #[test]
    fn test_cleaned_components() {
        let mask = three_blob_mask();
        let cleaned = mask.cleaned_components(2);
        assert_eq!(cleaned.bone_count(), 27 + 8);

        // 阈值高于全部连通域时结果为空.
        assert_eq!(mask.cleaned_components(100).bone_count(), 0);
    }

    #[test]
    fn test_largest_components() {
        let mask = three_blob_mask();
        assert_eq!(mask.largest_components(2).bone_count(), 27 + 8);
        assert_eq!(mask.largest_components(1).bone_count(), 27);

        // n 超过连通域个数时全部保留.
        assert_eq!(mask.largest_components(10).bone_count(), 36);
    }

    #[test]
    fn test_mean_hu_over_mask() {
        let mut data = Array3::<f32>::zeros((3, 3, 1));
        data[[0, 0, 0]] = 400.0;
        data[[1, 0, 0]] = 800.0;
        let scan = CtScan::fake(data, [1.0, 1.0, 1.0]);

        let mask = scan.threshold_mask(BONE_HU_LOWER, BONE_HU_UPPER);
        let mean = scan.mean_hu(mask.bone_pos());
        assert!((mean - 600.0).abs() < 1e-6);
    }
}
