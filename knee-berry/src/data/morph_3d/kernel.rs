//! 椭球结构元.

use crate::Idx3d;
use itertools::iproduct;

/// 三维椭球结构元.
///
/// 结构元在每个轴上的尺寸都是奇数, 中心位于几何中点. 一个偏移格点
/// `(dz, dh, dw)` 属于结构元, 当且仅当
/// `(dz/r_z)^2 + (dh/r_h)^2 + (dw/r_w)^2 <= 1.0`.
/// 半径按体素各向异性分辨率换算, 因此以该结构元做形态学扩张,
/// 在物理 (毫米) 空间上是各向同性的.
///
/// 结构元构造是确定性的: 相同的输入总会得到相同的结构元.
#[derive(Debug, Clone)]
pub struct EllipsoidKernel {
    /// (z, h, w) 方向的体素半径.
    radius: [usize; 3],

    /// 结构元包含的全部中心偏移量, 按行优先序存储.
    offsets: Vec<(isize, isize, isize)>,
}

/// 将物理扩张距离换算为各轴体素半径.
///
/// 每个分量为 `ceil(distance_mm / spacing_axis)`: 向上取整保证请求的
/// 物理距离总能被覆盖, 代价是在分辨率较粗的轴上可能轻微过扩张.
///
/// `pix_dim` 按内部惯例以 \[z, h, w\] 顺序给出, 且所有分量必须为正
/// (由调用方保证).
pub fn voxel_radius(distance_mm: f64, pix_dim: [f64; 3]) -> [usize; 3] {
    pix_dim.map(|s| (distance_mm / s).ceil() as usize)
}

/// 单轴的归一化平方项. 半径为 0 的轴退化为一个点, 其贡献记为 0.
#[inline]
fn axis_term(d: isize, r: usize) -> f64 {
    if r == 0 {
        debug_assert_eq!(d, 0);
        0.0
    } else {
        let t = d as f64 / r as f64;
        t * t
    }
}

impl EllipsoidKernel {
    /// 根据物理扩张距离 (毫米) 和体素分辨率构造椭球结构元.
    ///
    /// `distance_mm` 必须非负, `pix_dim` 分量必须为正, 由调用方保证.
    /// `distance_mm` 为 0 时结构元退化为单个中心格点.
    pub fn from_physical(distance_mm: f64, pix_dim: [f64; 3]) -> Self {
        Self::from_radius(voxel_radius(distance_mm, pix_dim))
    }

    /// 根据各轴体素半径直接构造椭球结构元.
    pub fn from_radius(radius: [usize; 3]) -> Self {
        let [rz, rh, rw] = radius.map(|r| r as isize);
        let offsets = iproduct!(-rz..=rz, -rh..=rh, -rw..=rw)
            .filter(|&(dz, dh, dw)| {
                axis_term(dz, radius[0]) + axis_term(dh, radius[1]) + axis_term(dw, radius[2])
                    <= 1.0
            })
            .collect();

        Self { radius, offsets }
    }

    /// 获取 (z, h, w) 方向的体素半径.
    #[inline]
    pub fn radius(&self) -> [usize; 3] {
        self.radius
    }

    /// 获取结构元数组的形状. 每个分量都是奇数.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let [rz, rh, rw] = self.radius;
        (2 * rz + 1, 2 * rh + 1, 2 * rw + 1)
    }

    /// 获取结构元包含的全部中心偏移量.
    #[inline]
    pub fn offsets(&self) -> &[(isize, isize, isize)] {
        &self.offsets
    }

    /// 获取结构元包含的格点个数. 中心格点总是被包含, 因此该值至少为 1.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// 结构元是否只包含中心格点?
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxel_radius_ceil() {
        // 0.7mm 分辨率下扩张 2mm: ceil(2 / 0.7) = 3.
        assert_eq!(voxel_radius(2.0, [5.0, 0.7, 0.7]), [1, 3, 3]);
        assert_eq!(voxel_radius(2.0, [1.0, 1.0, 1.0]), [2, 2, 2]);
        assert_eq!(voxel_radius(0.0, [1.0, 1.0, 1.0]), [0, 0, 0]);
    }

    #[test]
    fn test_kernel_shape_is_odd() {
        let kernel = EllipsoidKernel::from_physical(2.0, [5.0, 0.7, 0.7]);
        let (z, h, w) = kernel.shape();
        assert_eq!((z, h, w), (3, 7, 7));
        assert!(z % 2 == 1 && h % 2 == 1 && w % 2 == 1);
    }

    #[test]
    fn test_kernel_zero_distance_collapses_to_center() {
        let kernel = EllipsoidKernel::from_physical(0.0, [1.0, 1.0, 1.0]);
        assert!(kernel.is_degenerate());
        assert_eq!(kernel.offsets(), [(0, 0, 0)]);
    }

    #[test]
    fn test_kernel_unit_radius_is_diamond() {
        // 半径全 1 的椭球即 6-连通钻石: 中心 + 六个面邻居.
        let kernel = EllipsoidKernel::from_radius([1, 1, 1]);
        assert_eq!(kernel.len(), 7);
        assert!(kernel.offsets().contains(&(0, 0, 0)));
        assert!(kernel.offsets().contains(&(1, 0, 0)));
        assert!(!kernel.offsets().contains(&(1, 1, 0)));
    }

    #[test]
    fn test_kernel_collapsed_axis() {
        // z 半径为 0: 结构元退化为平面圆盘, 但仍然合法.
        let kernel = EllipsoidKernel::from_radius([0, 2, 2]);
        assert_eq!(kernel.shape(), (1, 5, 5));
        assert!(kernel.offsets().iter().all(|&(dz, _, _)| dz == 0));
        assert!(kernel.offsets().contains(&(0, 2, 0)));
        assert!(!kernel.offsets().contains(&(0, 2, 2)));
    }

    #[test]
    fn test_kernel_symmetry() {
        let kernel = EllipsoidKernel::from_radius([1, 2, 3]);
        for &(dz, dh, dw) in kernel.offsets() {
            assert!(kernel.offsets().contains(&(-dz, -dh, -dw)));
        }
    }
}
