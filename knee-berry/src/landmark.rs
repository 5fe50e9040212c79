//! 内外侧标志点检测.
//!
//! 沿给定方向扫描水平切片, 在第一个含骨骼前景的切片上, 以前景
//! w 坐标均值为中心线划分内侧 (medial) 与外侧 (lateral) 两个子集,
//! 并在每个子集中取 h 坐标最大的体素作为标志点.

use crate::consts::gray::*;
use crate::{BoneMask, Idx2d, Idx3d, NiftiHeaderAttr};
use either::Either;
use std::error::Error;
use std::fmt;

/// 切片扫描方向.
///
/// 放射学惯例中 z 索引通常沿上-下方向递增, 因此从最大索引向下扫描
/// 找到的第一个非空切片即 "最低" 切片. 该惯例并不对照图像的方向元数据
/// 做校验, 所以扫描方向由调用方显式给出.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ScanOrder {
    /// 从最大 z 索引向 0 扫描 (默认).
    #[default]
    Descending,

    /// 从 0 向最大 z 索引扫描.
    Ascending,
}

/// 标志点检测的运行时错误.
#[derive(Debug, Clone, PartialEq)]
pub enum LandmarkError {
    /// 所有切片都不存在骨骼前景.
    EmptyMask,

    /// 选中的切片上, 中心线的某一侧不存在骨骼前景.
    OneSided {
        /// 选中的切片索引.
        z: usize,
    },
}

impl fmt::Display for LandmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMask => write!(f, "mask 中不存在任何骨骼前景体素"),
            Self::OneSided { z } => {
                write!(f, "切片 z = {z} 上中心线的某一侧不存在骨骼前景")
            }
        }
    }
}

impl Error for LandmarkError {}

/// 标志点检测实现块
impl BoneMask {
    /// 按 `order` 方向扫描, 返回第一个含骨骼前景的切片索引.
    /// 若所有切片均为全背景, 返回 `None`.
    pub fn first_bone_slice(&self, order: ScanOrder) -> Option<usize> {
        let z_iter = match order {
            ScanOrder::Descending => Either::Left((0..self.len_z()).rev()),
            ScanOrder::Ascending => Either::Right(0..self.len_z()),
        };
        z_iter.into_iter().find(|&z| self.slice_at(z).has_bone())
    }

    /// 在按 `order` 方向找到的第一个非空切片上检测内外侧标志点.
    ///
    /// 中心线取该切片全部前景体素 w 坐标的均值 (向零截断). `w < 中心`
    /// 的体素为内侧, `w >= 中心` 的体素为外侧. 每侧取 h 坐标最大的体素;
    /// 若最大值有多个, 取行优先扫描序中第一个出现者 (即 w 最小者).
    ///
    /// # 返回值
    ///
    /// `(内侧点, 外侧点)`, 均为 `(z, h, w)` 三元组, `z` 固定为选中的
    /// 切片索引.
    ///
    /// # 错误
    ///
    /// 1. mask 完全为空时返回 [`LandmarkError::EmptyMask`];
    /// 2. 选中切片上某一侧为空时返回 [`LandmarkError::OneSided`].
    pub fn lowest_medial_lateral(
        &self,
        order: ScanOrder,
    ) -> Result<(Idx3d, Idx3d), LandmarkError> {
        let z = self.first_bone_slice(order).ok_or(LandmarkError::EmptyMask)?;
        let sli = self.slice_at(z);

        let mut w_sum = 0usize;
        let mut n = 0usize;
        for ((_, w), _) in sli.indexed_iter().filter(|(_, p)| is_bone(**p)) {
            w_sum += w;
            n += 1;
        }
        debug_assert!(n > 0);
        let center = (w_sum as f64 / n as f64) as usize;

        // 每侧保留首个 h 最大体素 (严格大于才替换).
        let mut medial: Option<Idx2d> = None;
        let mut lateral: Option<Idx2d> = None;
        for ((h, w), _) in sli.indexed_iter().filter(|(_, p)| is_bone(**p)) {
            let side = if w < center { &mut medial } else { &mut lateral };
            match side {
                Some((best_h, _)) if h <= *best_h => {}
                _ => *side = Some((h, w)),
            }
        }

        match (medial, lateral) {
            (Some((mh, mw)), Some((lh, lw))) => Ok(((z, mh, mw), (z, lh, lw))),
            _ => Err(LandmarkError::OneSided { z }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_landmark_empty_mask() {
        let mask = BoneMask::fake(Array3::<u8>::zeros((6, 6, 4)), [1.0, 1.0, 1.0]);
        assert_eq!(
            mask.lowest_medial_lateral(ScanOrder::Descending),
            Err(LandmarkError::EmptyMask)
        );
        assert_eq!(mask.first_bone_slice(ScanOrder::Descending), None);
    }

    #[test]
    fn test_landmark_two_clusters() {
        // [w, h, z] 布局. z = 3 上放置两簇:
        // 内侧 {(1, 5), (2, 6)}, 外侧 {(7, 4), (8, 6), (8, 2)}.
        let mut data = Array3::<u8>::zeros((10, 10, 5));
        for (w, h) in [(1, 5), (2, 6), (7, 4), (8, 6), (8, 2)] {
            data[[w, h, 3]] = 1;
        }
        let mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        // w 均值 = 26 / 5 = 5.2, 截断后中心为 5.
        let (medial, lateral) = mask.lowest_medial_lateral(ScanOrder::Descending).unwrap();
        assert_eq!(medial, (3, 6, 2));
        assert_eq!(lateral, (3, 6, 8));
    }

    #[test]
    fn test_landmark_tie_breaks_to_first_occurrence() {
        // 外侧有两个 h 相同的最大体素, 应取 w 较小者.
        let mut data = Array3::<u8>::zeros((10, 10, 2));
        for (w, h) in [(1, 3), (6, 6), (8, 6)] {
            data[[w, h, 0]] = 1;
        }
        let mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        let (medial, lateral) = mask.lowest_medial_lateral(ScanOrder::Descending).unwrap();
        assert_eq!(medial, (0, 3, 1));
        assert_eq!(lateral, (0, 6, 6));
    }

    #[test]
    fn test_landmark_picks_first_nonempty_slice() {
        // z = 1 和 z = 3 都有前景; 降序扫描应选 z = 3, 升序应选 z = 1.
        let mut data = Array3::<u8>::zeros((8, 8, 5));
        for (w, h) in [(2, 2), (6, 3)] {
            data[[w, h, 1]] = 1;
            data[[w, h, 3]] = 1;
        }
        let mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        assert_eq!(mask.first_bone_slice(ScanOrder::Descending), Some(3));
        assert_eq!(mask.first_bone_slice(ScanOrder::Ascending), Some(1));

        let (medial, _) = mask.lowest_medial_lateral(ScanOrder::Descending).unwrap();
        assert_eq!(medial.0, 3);
        let (medial, _) = mask.lowest_medial_lateral(ScanOrder::Ascending).unwrap();
        assert_eq!(medial.0, 1);
    }

    #[test]
    fn test_landmark_one_sided_slice() {
        // 只有一个体素: 中心线即它自身的 w, 因此内侧为空.
        let mut data = Array3::<u8>::zeros((6, 6, 3));
        data[[2, 2, 1]] = 1;
        let mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        assert_eq!(
            mask.lowest_medial_lateral(ScanOrder::Descending),
            Err(LandmarkError::OneSided { z: 1 })
        );
    }
}
