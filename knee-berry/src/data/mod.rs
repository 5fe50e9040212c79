use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayViewMut, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::gray::*;
use crate::{Idx2d, Idx3d, Predicate};

pub mod morph_3d;
pub mod slice;
pub mod window;

pub use slice::{
    ImgWriteRaw, ImgWriteVis, MaskSlice, MaskSliceMut, OwnedMaskSlice, OwnedScanSlice, ScanSlice,
    ScanSliceMut,
};

#[cfg(feature = "plot")]
pub use slice::ImgDisplay;

pub use window::CtWindow;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
pub(crate) type BoxedHeader = Box<NiftiHeader>;

/// nii 格式 3D CT 扫描, 包括 header 和 CT 扫描 (HU). HU 值以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct CtScan {
    header: BoxedHeader,
    data: Array3<f32>,
}

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 3D CT nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    ///
    /// 该值也可以通过 `self.{z_mm, height_mm, width_mm}` 分别获取.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取 width 方向 (自然 2D 图像的水平方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn width_mm(&self) -> f64 {
        self.header().pixdim[1] as f64
    }

    /// 获取 height 方向 (自然 2D 图像的垂直方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn height_mm(&self) -> f64 {
        self.header().pixdim[2] as f64
    }

    /// 获取空间方向 (相邻 2D 切片的方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn z_mm(&self) -> f64 {
        self.header().pixdim[3] as f64
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.pix_dim();
        z == h && z == w
    }

    /// 体素分辨率的三个分量是否都是正数? mask 几何算法要求该性质成立.
    #[inline]
    fn has_positive_spacing(&self) -> bool {
        self.pix_dim().iter().all(|s| *s > 0.0)
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }
}

impl NiftiHeaderAttr for CtScan {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for CtScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for CtScan {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl CtScan {
    /// 打开 nii 文件格式的 3D CT 扫描. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let data =
            Array3::<f32>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
                .unwrap();

        Ok(Self { header, data })
    }

    /// 根据裸扫描数据和体素分辨率直接创建 `CtScan` 实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 按照 nifti 惯用标准以 \[w, h, z\] 格式存储.
    /// 2. `pix_dim` 按照 \[w, h, z\] 格式存储.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<f32>, pix_dim: [f32; 3]) -> Self {
        Self {
            header: fake_header(data.dim(), pix_dim),
            data: to_internal_layout(data),
        }
    }

    /// 计算由 `it` 给出的所有索引对应的 CT HU 值的平均值.
    ///
    /// 如果存在越界索引, 则程序 panic.
    pub fn mean_hu<I: IntoIterator<Item = Idx3d>>(&self, it: I) -> f64 {
        let mut count = 0u64;
        let mut hu = 0.0;
        for pos in it.into_iter() {
            count += 1;
            hu += self[pos] as f64;
        }
        hu / (count as f64)
    }

    /// 获取 3D 扫描 z 空间的第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ScanSlice<'_> {
        ScanSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取 3D 扫描 z 空间的第 `z_index` 层可变切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at_mut(&mut self, z_index: usize) -> ScanSliceMut<'_> {
        ScanSliceMut::new(self.data.index_axis_mut(Axis(0), z_index))
    }

    /// 获取能按升序迭代 3D 扫描水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ScanSlice> {
        self.data.axis_iter(Axis(0)).map(ScanSlice::new)
    }

    /// 获取能按升序迭代 3D 扫描水平可变切片的迭代器.
    #[inline]
    pub fn slice_iter_mut(&mut self) -> impl ExactSizeIterator<Item = ScanSliceMut> {
        self.data.axis_iter_mut(Axis(0)).map(ScanSliceMut::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, f32, Ix3> {
        self.data.view_mut()
    }
}

/// nii 格式 3D 二值骨骼标注, 包括 header 和 mask 数据.
/// 体素值以 `u8` 保存, 且只允许取 0 (背景) 或 1 (骨骼).
#[derive(Debug, Clone, PartialEq)]
pub struct BoneMask {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for BoneMask {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for BoneMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for BoneMask {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// 以 (w, h, z) 布局重排 `data` 到内部 (z, H, W) 布局, 并保证行优先存储.
fn to_internal_layout<T: Clone>(data: Array3<T>) -> Array3<T> {
    let data = data.permuted_axes([2, 1, 0]);
    let data = if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().to_owned()
    };
    debug_assert!(data.is_standard_layout());
    data
}

/// 按 \[w, h, z\] 格式的形状和分辨率构造一致的 fake header.
fn fake_header((w, h, z): Idx3d, pix_dim: [f32; 3]) -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
    let [_, pw, ph, pz, ..] = &mut header.pixdim;
    let [w_mm, h_mm, z_mm] = &pix_dim;
    (*pw, *ph, *pz) = (*w_mm, *h_mm, *z_mm);
    header.intent_name[..4].copy_from_slice(b"fake");
    header
}

impl BoneMask {
    /// 打开 nii 文件格式的 3D 骨骼标注. `path` 为 nii 文件的本地路径. 如果打开成功,
    /// 则返回 `Ok(Self)`, 否则返回 `Err`.
    ///
    /// 所有非零体素都会被强制归一为 1, 以维持二值 mask 不变量.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z] -> [z, H, W]
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray::<u8>()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let mut data =
            Array3::<u8>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
                .unwrap();
        data.mapv_inplace(|p| u8::from(p != MASK_BACKGROUND));

        Ok(Self { header, data })
    }

    /// 将 mask 以 nii/nii.gz 格式保存到 `path`. 数据按 nifti 惯用标准以
    /// \[w, h, z\] 格式、`u8` 二值表示写出, header 复用载入时保留的引用 header.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> nifti::Result<()> {
        // (z, H, W) -> [W, H, z].
        let data = self.data.view().permuted_axes([2, 1, 0]);
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&data)
    }

    /// 根据裸标签数据和体素分辨率直接创建 `BoneMask` 实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 的数据必须为 0 或 1. 否则程序行为未定义.
    /// 2. `data` 按照 nifti 惯用标准以 \[w, h, z\] 格式存储.
    /// 3. `pix_dim` 按照 \[w, h, z\] 格式存储.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<u8>, pix_dim: [f32; 3]) -> Self {
        Self {
            header: fake_header(data.dim(), pix_dim),
            data: to_internal_layout(data),
        }
    }

    /// 直接创建数据.
    ///
    /// # 注意
    ///
    /// **目前** 你应当使输入满足以下性质, 否则程序行为未定义:
    ///
    /// 1. `data` 按照 \[width, height, z\] 组织, 内部体素值必须为 0 或 1.
    /// 2. `header` 必须满足其格式标准, 且形状与 `data` 一致.
    #[inline]
    pub fn fake_with_header(header: &NiftiHeader, data: Array3<u8>) -> Self {
        let mut header = Box::new(header.clone());
        header.intent_name[..4].copy_from_slice(b"fake");
        Self {
            header,
            data: to_internal_layout(data),
        }
    }

    /// 判断该结构是否是由 `fake_*` 方法手动拼接的.
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 以内部 (z, H, W) 布局直接构造. 仅供 crate 内部的变换算法使用.
    #[inline]
    pub(crate) fn from_internal(header: BoxedHeader, data: Array3<u8>) -> Self {
        debug_assert!(data.is_standard_layout());
        Self { header, data }
    }

    /// 复用 `self` 的 header, 以新的内部布局数据构造新 mask.
    #[inline]
    pub(crate) fn with_data(&self, data: Array3<u8>) -> Self {
        Self::from_internal(self.header.clone(), data)
    }

    /// 获取 3D 标注 z 空间的第 `z_index` 层不可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> MaskSlice {
        MaskSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取 3D 标注 z 空间的第 `z_index` 层可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at_mut(&mut self, z_index: usize) -> MaskSliceMut {
        MaskSliceMut::new(self.data.index_axis_mut(Axis(0), z_index))
    }

    /// 获取能按升序迭代 3D 标注水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = MaskSlice> {
        self.data.axis_iter(Axis(0)).map(MaskSlice::new)
    }

    /// 获取能按升序迭代 3D 标注水平可变切片的迭代器.
    #[inline]
    pub fn slice_iter_mut(&mut self) -> impl ExactSizeIterator<Item = MaskSliceMut> {
        self.data.axis_iter_mut(Axis(0)).map(MaskSliceMut::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, u8, Ix3> {
        self.data.view_mut()
    }

    /// 获取 3D 标注中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获取 3D 标注中骨骼前景体素个数.
    #[inline]
    pub fn bone_count(&self) -> usize {
        self.count(MASK_BONE)
    }

    /// 获取 mask 的基本统计信息.
    ///
    /// 统计信息格式为: \[背景体素数, 骨骼体素数\].
    pub fn numeric_statistics(&self) -> [usize; 2] {
        let mut ans = [0; 2];
        for pixel in self.data.iter().filter(|p| **p <= 1) {
            ans[*pixel as usize] += 1;
        }
        ans
    }

    /// 将 3D 标注中值为 `old` 的体素全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn replace(&mut self, old: u8, new: u8) -> usize {
        let mut cnt = 0usize;
        self.data_mut()
            .iter_mut()
            .filter(|pix| **pix == old)
            .for_each(|p| {
                cnt += 1;
                *p = new;
            });
        cnt
    }

    /// 收集满足谓词 `pred` 的所有体素对应的下标, 结果按行优先存储.
    pub fn filter_pos(&self, pred: Predicate) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(ref pos, pixel)| pred(*pixel).then_some(*pos))
            .collect()
    }

    /// 收集所有骨骼体素对应的下标. 结果按行优先存储.
    #[inline]
    pub fn bone_pos(&self) -> Vec<Idx3d> {
        self.filter_pos(is_bone)
    }

    /// 获取 `pos` 前后上下左右六个点的坐标.
    ///
    /// 在数据范围外的坐标会被过滤掉, 不会包含在返回值中.
    pub(crate) fn diamond_neighbours(&self, (z, h, w): Idx3d) -> Vec<Idx3d> {
        let (zl, hl, wl) = self.data.dim();
        [
            (z.wrapping_sub(1), h, w),
            (z.saturating_add(1), h, w),
            (z, h.wrapping_sub(1), w),
            (z, h.saturating_add(1), w),
            (z, h, w.wrapping_sub(1)),
            (z, h, w.saturating_add(1)),
        ]
        .into_iter()
        .filter(|&(z0, h0, w0)| z0 < zl && h0 < hl && w0 < wl)
        .collect()
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl BoneMask {
    /// 借助 `rayon`, 并行地对 3D 标注每个水平可变切片实施 `op` 操作.
    pub fn par_for_each_slice_mut<F>(&mut self, op: F)
    where
        F: Fn(MaskSliceMut) + Sync + Send,
    {
        self.data_mut()
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|v| {
                op(MaskSliceMut::new(v));
            });
    }

    /// 借助 `rayon`, 并行地对 3D 标注每个水平不可变切片实施 `op` 操作.
    pub fn par_for_each_slice<F>(&self, op: F)
    where
        F: Fn(MaskSlice) + Sync + Send,
    {
        self.data()
            .axis_iter(Axis(0))
            .into_par_iter()
            .for_each(|v| {
                op(MaskSlice::new(v));
            });
    }

    /// 借助 `rayon`, 并行地对 3D 标注每个水平不可变切片实施 `op` 操作.
    /// 该操作会同时携带 z 方向索引信息.
    pub fn par_for_each_indexed_slice<F>(&self, op: F)
    where
        F: Fn(usize, MaskSlice) + Sync + Send,
    {
        self.data()
            .axis_iter(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, v)| {
                op(i, MaskSlice::new(v));
            });
    }

    /// 借助 `rayon`, 并行地将 3D 标注中值为 `old` 的体素全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn par_replace(&mut self, old: u8, new: u8) -> usize {
        let cnt = AtomicUsize::new(0);
        self.data_mut()
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|v| {
                let mut sli = MaskSliceMut::new(v);
                let local = sli.replace(old, new);
                cnt.fetch_add(local, Ordering::Release);
            });

        cnt.load(Ordering::Acquire)
    }
}

/// nii 格式的 3D CT 扫描与对应的骨骼标注.
///
/// 该结构完全透明, 仅包含两个公开的 `scan` 和 `mask` 子结构,
/// 用户可以直接使用它们来实现相关上层功能.
///
/// # 注意
///
/// 两个子结构的数据一致性由用户保证, 否则程序行为未定义.
#[derive(Debug, Clone)]
pub struct CtData3d {
    /// 3D CT 扫描.
    pub scan: CtScan,

    /// 3D 骨骼标注.
    pub mask: BoneMask,
}

impl CtData3d {
    /// 分别打开 nii 文件格式的 3D CT 扫描和对应标注. 如果任一文件打开失败, 则返回 `Err`.
    /// 若两个文件的数据文件形状不一致, 则程序 `panic`.
    pub fn open(scan_path: impl AsRef<Path>, mask_path: impl AsRef<Path>) -> nifti::Result<Self> {
        let scan = CtScan::open(scan_path.as_ref())?;
        let mask = BoneMask::open(mask_path.as_ref())?;
        assert_eq!(scan.shape(), mask.shape(), "CT 扫描和标注形状不一致");
        Ok(Self { scan, mask })
    }

    /// 获取水平切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.mask.len_z()
    }

    /// 依次获取 3D 扫描和 3D 标注 z 空间的第 `z_index` 层不可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> (ScanSlice<'_>, MaskSlice<'_>) {
        (self.scan.slice_at(z_index), self.mask.slice_at(z_index))
    }

    /// 获取能按升序迭代 3D 水平 (扫描, 标注) 不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = (ScanSlice, MaskSlice)> {
        self.scan.slice_iter().zip(self.mask.slice_iter())
    }

    /// 获取能按行优先序迭代 3D (扫描, 标注) 体素的迭代器.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&f32, &u8)> {
        self.scan.data.iter().zip(self.mask.data.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_fake_mask_shape_consistency() {
        // [w, h, z] = [4, 3, 2].
        let data = Array3::<u8>::zeros((4, 3, 2));
        let mask = BoneMask::fake(data, [1.0, 1.0, 2.0]);

        assert!(mask.is_faked());
        // 内部布局为 (z, H, W).
        assert_eq!(mask.shape(), (2, 3, 4));
        assert_eq!(mask.data().dim(), (2, 3, 4));
        assert_eq!(mask.pix_dim(), [2.0, 1.0, 1.0]);
        assert!(mask.has_positive_spacing());
    }

    #[test]
    fn test_bone_count_and_replace() {
        let mut data = Array3::<u8>::zeros((5, 5, 5));
        data[[2, 2, 2]] = 1;
        data[[3, 2, 2]] = 1;
        let mut mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        assert_eq!(mask.bone_count(), 2);
        assert_eq!(mask.numeric_statistics(), [123, 2]);

        let replaced = mask.replace(1, 0);
        assert_eq!(replaced, 2);
        assert_eq!(mask.bone_count(), 0);
    }

    #[test]
    fn test_diamond_neighbours_at_corner() {
        let data = Array3::<u8>::zeros((3, 3, 3));
        let mask = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        assert_eq!(mask.diamond_neighbours((0, 0, 0)).len(), 3);
        assert_eq!(mask.diamond_neighbours((1, 1, 1)).len(), 6);
    }

    #[test]
    #[cfg(feature = "rayon")]
    fn test_par_replace_matches_serial() {
        let mut data = Array3::<u8>::zeros((6, 6, 6));
        data[[1, 1, 1]] = 1;
        data[[4, 2, 3]] = 1;
        let mut a = BoneMask::fake(data.clone(), [1.0, 1.0, 1.0]);
        let mut b = BoneMask::fake(data, [1.0, 1.0, 1.0]);

        assert_eq!(a.replace(1, 0), b.par_replace(1, 0));
        assert_eq!(a.data(), b.data());
    }
}
