//! mask 边界随机化.
//!
//! 在原 mask 与给定物理距离界定的外侧范围之间生成随机扰动边界:
//! 先计算 mask 补集的物理距离场, 再为每个体素抽取独立的均匀随机阈值,
//! 距离落在 `(0, 阈值]` 内的背景体素被并入前景.
//!
//! 随机源由调用方显式注入, 因此给定同一随机源状态 (如同一种子),
//! 结果是完全可复现的.

use crate::{BoneMask, NiftiHeaderAttr};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::fmt;

mod edt;

use crate::consts::gray::*;

/// mask 随机化的运行时错误.
#[derive(Debug, Clone, PartialEq)]
pub enum RandomizeError {
    /// 最大随机化距离为负数.
    NegativeDistance(f64),

    /// 体素分辨率存在非正分量.
    NonPositiveSpacing(f64),
}

impl fmt::Display for RandomizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDistance(d) => write!(f, "最大随机化距离必须非负, 但得到 {d}mm"),
            Self::NonPositiveSpacing(s) => write!(f, "体素分辨率分量必须为正, 但得到 {s}mm"),
        }
    }
}

impl Error for RandomizeError {}

/// 校验体素分辨率分量为正.
fn checked_pix_dim(mask: &BoneMask) -> Result<[f64; 3], RandomizeError> {
    let pix_dim = mask.pix_dim();
    match pix_dim.iter().find(|s| !(**s > 0.0)) {
        Some(s) => Err(RandomizeError::NonPositiveSpacing(*s)),
        None => Ok(pix_dim),
    }
}

/// mask 随机化实现块
impl BoneMask {
    /// 计算 mask 补集的物理欧氏距离场.
    ///
    /// 返回值与 mask 同形状: 前景体素处为 0, 背景体素处为它到最近前景
    /// 体素的毫米距离. 若 mask 完全为空, 则所有值为 `f64::INFINITY`.
    ///
    /// # 错误
    ///
    /// 体素分辨率存在非正分量时返回 `Err`.
    pub fn distance_field_mm(&self) -> Result<Array3<f64>, RandomizeError> {
        let pix_dim = checked_pix_dim(self)?;
        Ok(edt::sqrt_field(edt::squared_edt_3d(self.data(), pix_dim)))
    }

    /// 用注入的随机源在 mask 边界外侧生成随机扰动, 返回新 mask.
    ///
    /// 每个体素按行优先序从 `rng` 抽取一个 `[0, max_distance_mm)` 内的
    /// 均匀随机阈值; 距离场值落在 `(0, 阈值]` 内的背景体素被并入前景.
    /// 因此返回值总是 `self` 的体素超集, 且 `max_distance_mm` 为 0 时
    /// 与 `self` 相同.
    ///
    /// 抽取顺序是确定性的: 随机源初始状态相同, 则输出逐位一致.
    ///
    /// # 错误
    ///
    /// `max_distance_mm` 为负或体素分辨率存在非正分量时返回 `Err`.
    pub fn randomized_with<R: Rng + ?Sized>(
        &self,
        max_distance_mm: f64,
        rng: &mut R,
    ) -> Result<BoneMask, RandomizeError> {
        if max_distance_mm < 0.0 {
            return Err(RandomizeError::NegativeDistance(max_distance_mm));
        }
        let pix_dim = checked_pix_dim(self)?;

        let field = edt::sqrt_field(edt::squared_edt_3d(self.data(), pix_dim));
        let mut data = self.data().to_owned();
        for (slot, &dist) in data.iter_mut().zip(field.iter()) {
            // 即使体素不可能被并入, 也要消耗一次抽取, 保证抽取序列
            // 只由 mask 形状决定.
            let threshold = rng.gen::<f64>() * max_distance_mm;
            if dist > 0.0 && dist <= threshold {
                *slot = MASK_BONE;
            }
        }

        Ok(self.with_data(data))
    }

    /// 与 [`Self::randomized_with`] 相同, 但随机源由 `seed` 构造.
    ///
    /// `seed` 为 `Some` 时使用 `StdRng::seed_from_u64`, 输出完全可复现;
    /// 为 `None` 时使用线程本地随机源, 输出不可复现.
    pub fn randomized(
        &self,
        max_distance_mm: f64,
        seed: Option<u64>,
    ) -> Result<BoneMask, RandomizeError> {
        match seed {
            Some(s) => self.randomized_with(max_distance_mm, &mut StdRng::seed_from_u64(s)),
            None => self.randomized_with(max_distance_mm, &mut rand::thread_rng()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array3};

    fn cube_mask() -> BoneMask {
        let mut data = Array3::<u8>::zeros((10, 10, 10));
        data.slice_mut(s![4..7, 4..7, 4..7]).fill(1);
        BoneMask::fake(data, [1.0, 1.0, 1.0])
    }

    fn is_superset(sup: &BoneMask, sub: &BoneMask) -> bool {
        sup.data()
            .iter()
            .zip(sub.data().iter())
            .all(|(a, b)| *a >= *b)
    }

    #[test]
    fn test_randomize_deterministic_per_seed() {
        let mask = cube_mask();
        let a = mask.randomized(0.5, Some(42)).unwrap();
        let b = mask.randomized(0.5, Some(42)).unwrap();
        assert_eq!(a.data(), b.data());

        // 不同种子只验证各自的确定性, 不保证彼此不同.
        let c = mask.randomized(0.5, Some(43)).unwrap();
        let d = mask.randomized(0.5, Some(43)).unwrap();
        assert_eq!(c.data(), d.data());
    }

    #[test]
    fn test_randomize_zero_distance_is_identity() {
        let mask = cube_mask();
        let out = mask.randomized(0.0, Some(7)).unwrap();
        assert_eq!(out.data(), mask.data());
    }

    #[test]
    fn test_randomize_is_superset() {
        let mask = cube_mask();
        let out = mask.randomized(2.0, Some(42)).unwrap();
        assert!(is_superset(&out, &mask));
        assert!(out.bone_count() >= mask.bone_count());
    }

    #[test]
    fn test_randomize_growth_is_bounded_by_distance() {
        let mask = cube_mask();
        let out = mask.randomized(1.0, Some(42)).unwrap();
        let field = mask.distance_field_mm().unwrap();

        // 新增体素的距离场值必须落在 (0, 1.0] 内.
        for ((pos, &val), &orig) in out.data().indexed_iter().zip(mask.data().iter()) {
            if val == 1 && orig == 0 {
                assert!(field[pos] > 0.0 && field[pos] <= 1.0);
            }
        }
    }

    #[test]
    fn test_randomize_rejects_bad_input() {
        let mask = cube_mask();
        assert_eq!(
            mask.randomized(-0.5, Some(1)),
            Err(RandomizeError::NegativeDistance(-0.5))
        );

        let bad = BoneMask::fake(Array3::<u8>::zeros((3, 3, 3)), [1.0, -1.0, 1.0]);
        assert_eq!(
            bad.randomized(1.0, Some(1)),
            Err(RandomizeError::NonPositiveSpacing(-1.0))
        );
    }

    #[test]
    fn test_randomize_empty_mask_stays_empty() {
        let mask = BoneMask::fake(Array3::<u8>::zeros((4, 4, 4)), [1.0, 1.0, 1.0]);
        let out = mask.randomized(3.0, Some(9)).unwrap();
        assert_eq!(out.bone_count(), 0);
    }

    #[test]
    fn test_distance_field_values() {
        let mut data = Array3::<u8>::zeros((5, 5, 5));
        data[[2, 2, 2]] = 1;
        let mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        let field = mask.distance_field_mm().unwrap();
        assert_eq!(field[[2, 2, 2]], 0.0);
        assert_eq!(field[[2, 2, 3]], 1.0);
    }
}
