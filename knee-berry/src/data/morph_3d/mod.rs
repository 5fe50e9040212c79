//! 3D 形态学操作.
//!
//! 提供以椭球结构元为基础的二值 mask 扩张. 扩张距离以毫米给出,
//! 结构元半径按体素分辨率逐轴换算, 保证扩张在物理空间上各向同性.

use crate::consts::gray::*;
use crate::{BoneMask, NiftiHeaderAttr};
use std::error::Error;
use std::fmt;

mod kernel;

pub use kernel::{voxel_radius, EllipsoidKernel};

/// mask 扩张的运行时错误.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpandError {
    /// 扩张距离为负数.
    NegativeDistance(f64),

    /// 体素分辨率存在非正分量.
    NonPositiveSpacing(f64),
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDistance(d) => write!(f, "扩张距离必须非负, 但得到 {d}mm"),
            Self::NonPositiveSpacing(s) => write!(f, "体素分辨率分量必须为正, 但得到 {s}mm"),
        }
    }
}

impl Error for ExpandError {}

/// mask 扩张实现块
impl BoneMask {
    /// 将 mask 沿边界向外扩张 `distance_mm` 毫米, 返回新 mask.
    ///
    /// 扩张使用椭球结构元做二值形态学膨胀. 结构元半径为
    /// `ceil(distance_mm / spacing)` (逐轴), 因此请求的物理距离总能被覆盖,
    /// 在分辨率较粗的轴上可能轻微过扩张.
    ///
    /// # 保证
    ///
    /// 1. 返回值总是 `self` 的体素超集, 且体素值仍为 0/1.
    /// 2. `distance_mm` 为 0 时返回值与 `self` 相同.
    /// 3. 扩张体积随 `distance_mm` 单调不减.
    /// 4. `self` 不会被修改.
    ///
    /// # 错误
    ///
    /// `distance_mm` 为负或体素分辨率存在非正分量时返回 `Err`.
    pub fn expanded_mm(&self, distance_mm: f64) -> Result<BoneMask, ExpandError> {
        if distance_mm < 0.0 {
            return Err(ExpandError::NegativeDistance(distance_mm));
        }
        let pix_dim = self.pix_dim();
        if let Some(s) = pix_dim.iter().find(|s| !(**s > 0.0)) {
            return Err(ExpandError::NonPositiveSpacing(*s));
        }

        Ok(self.dilated(&EllipsoidKernel::from_physical(distance_mm, pix_dim)))
    }

    /// 以 `kernel` 为结构元对 mask 做二值形态学膨胀, 返回新 mask.
    ///
    /// 对输入中的每个前景体素, 将结构元覆盖到的所有格点置为前景.
    /// 越过数据边界的格点直接忽略.
    pub fn dilated(&self, kernel: &EllipsoidKernel) -> BoneMask {
        let mut out = self.data().to_owned();
        let (zl, hl, wl) = out.dim();

        for ((z, h, w), _) in self.data().indexed_iter().filter(|(_, p)| is_bone(**p)) {
            for &(dz, dh, dw) in kernel.offsets() {
                let z0 = z.wrapping_add_signed(dz);
                let h0 = h.wrapping_add_signed(dh);
                let w0 = w.wrapping_add_signed(dw);
                if z0 < zl && h0 < hl && w0 < wl {
                    out[(z0, h0, w0)] = MASK_BONE;
                }
            }
        }

        self.with_data(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array3};

    /// 10x10x10 全零网格, 中心放置 3x3x3 前景立方体.
    fn cube_mask(pix_dim: [f32; 3]) -> BoneMask {
        let mut data = Array3::<u8>::zeros((10, 10, 10));
        data.slice_mut(s![4..7, 4..7, 4..7]).fill(1);
        BoneMask::fake(data, pix_dim)
    }

    /// `sup` 是否在体素包含意义上覆盖 `sub`?
    fn is_superset(sup: &BoneMask, sub: &BoneMask) -> bool {
        sup.data()
            .iter()
            .zip(sub.data().iter())
            .all(|(a, b)| *a >= *b)
    }

    #[test]
    fn test_expand_zero_distance_is_identity() {
        let mask = cube_mask([1.0, 1.0, 1.0]);
        let out = mask.expanded_mm(0.0).unwrap();
        assert_eq!(out.data(), mask.data());
    }

    #[test]
    fn test_expand_rejects_bad_input() {
        let mask = cube_mask([1.0, 1.0, 1.0]);
        assert_eq!(
            mask.expanded_mm(-1.0),
            Err(ExpandError::NegativeDistance(-1.0))
        );

        let bad = cube_mask([1.0, 0.0, 1.0]);
        assert_eq!(
            bad.expanded_mm(1.0),
            Err(ExpandError::NonPositiveSpacing(0.0))
        );
    }

    #[test]
    fn test_expand_grows_and_stays_in_grid() {
        let mask = cube_mask([1.0, 1.0, 1.0]);
        let out = mask.expanded_mm(1.0).unwrap();

        assert!(out.bone_count() > mask.bone_count());
        assert!(out.bone_count() <= 1000);
        assert!(is_superset(&out, &mask));
    }

    #[test]
    fn test_expand_monotone_in_distance() {
        let mask = cube_mask([1.0, 1.0, 1.0]);
        let d1 = mask.expanded_mm(1.0).unwrap();
        let d2 = mask.expanded_mm(2.0).unwrap();

        assert!(is_superset(&d2, &d1));
        assert!(d2.bone_count() >= d1.bone_count());
    }

    #[test]
    fn test_expand_unit_distance_unit_spacing() {
        // 单体素前景 + 1mm 各向同性分辨率, 扩张 1mm 即 6-连通钻石.
        let mut data = Array3::<u8>::zeros((5, 5, 5));
        data[[2, 2, 2]] = 1;
        let mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        let out = mask.expanded_mm(1.0).unwrap();
        assert_eq!(out.bone_count(), 7);
        assert!(is_bone(out[(2, 2, 2)]));
        assert!(is_bone(out[(1, 2, 2)]));
        assert!(!is_bone(out[(1, 1, 2)]));
    }

    #[test]
    fn test_expand_anisotropic_reach() {
        // z 分辨率 2mm, 面内 1mm: 扩张 2mm 在 z 方向只推进 1 个体素,
        // 在面内方向推进 2 个体素.
        let mut data = Array3::<u8>::zeros((7, 7, 7));
        data[[3, 3, 3]] = 1;
        let mask = BoneMask::fake(data, [1.0, 1.0, 2.0]);

        let out = mask.expanded_mm(2.0).unwrap();
        assert!(is_bone(out[(2, 3, 3)]));
        assert!(is_bone(out[(4, 3, 3)]));
        assert!(!is_bone(out[(1, 3, 3)]));
        assert!(is_bone(out[(3, 1, 3)]));
        assert!(is_bone(out[(3, 3, 5)]));
    }

    #[test]
    fn test_dilate_near_border_is_clipped() {
        let mut data = Array3::<u8>::zeros((4, 4, 4));
        data[[0, 0, 0]] = 1;
        let mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        let out = mask.expanded_mm(1.0).unwrap();
        // 角点的钻石邻域只剩 3 个方向可扩.
        assert_eq!(out.bone_count(), 4);
    }
}
