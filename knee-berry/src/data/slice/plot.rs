//! 图片展示模块, 主要用于调试.
//!
//! # 注意
//!
//! 需要 `plot` feature.

use crate::consts::gray::*;
use crate::{BoneMask, CtScan, Idx2d, MaskSlice, MaskSliceMut, NiftiHeaderAttr, ScanSlice,
            ScanSliceMut};
use ndarray::ArrayView2;
use opencv::core::{Scalar, Size, Vec3b, CV_8UC3};
use opencv::highgui::{imshow, wait_key};
use opencv::prelude::{Mat, MatTrait, MatTraitConst};
use std::time::Duration;

/// 表明一个可以在窗口中可视化的对象.
pub trait ImgDisplay {
    /// 展示对象.
    fn show(&self);

    /// 同 `show()`, 但在之后自动等待一次用户按键输入.
    fn show_and_wait(&self) {
        self.show();
        wait_key(0).unwrap(); // never fails
    }

    /// 同 `show()`, 但在之后自动等待给定时间.
    fn show_and_wait_for(&self, d: Duration) -> opencv::Result<i32> {
        self.show();
        let ms = d.as_millis();
        assert!(ms <= i32::MAX as u128);
        wait_key(ms as i32)
    }
}

/// 将 `data` 按行优先格式, 以 `shape` 分辨率存储为矩阵.
/// 会额外进行可视化友好的体素值转换.
fn mask_slice_to_opencv_mat(data: &[u8], (h, w): Idx2d) -> Mat {
    assert_eq!(data.len(), h * w);
    let mut mat = Mat::from_slice_rows_cols(data, h, w).unwrap();

    let size = mat.size().unwrap();
    debug_assert_eq!(size.height as usize, h);
    debug_assert_eq!(size.width as usize, w);

    for i in 0..size.height {
        for j in 0..size.width {
            let slot = mat.at_2d_mut::<u8>(i, j).unwrap();
            *slot = super::save::pretty(*slot);
        }
    }
    mat
}

/// 将 `data` 按行优先格式, 以 `shape` 分辨率存储为矩阵.
/// 会额外进行可视化友好的体素值转换 (窗位 450, 窗宽 1500).
fn scan_slice_to_opencv_mat(data: ArrayView2<f32>, (h, w): Idx2d) -> Mat {
    use opencv::core::CV_8UC1;

    assert_eq!(data.len(), h * w);
    let mut mat =
        Mat::new_size_with_default(Size::new(w as i32, h as i32), CV_8UC1, Scalar::from(0))
            .unwrap();

    let size = mat.size().unwrap();
    debug_assert_eq!(size.height as usize, h);
    debug_assert_eq!(size.width as usize, w);

    const WINDOW: crate::CtWindow = crate::CtWindow::from_bone_visual();
    for i in 0..size.height {
        for j in 0..size.width {
            let slot = mat.at_2d_mut::<u8>(i, j).unwrap();
            *slot = WINDOW.eval(data[(i as usize, j as usize)]).unwrap();
        }
    }
    mat
}

macro_rules! impl_mask_display {
    ($($slice: ty),+) => {
        $(
            /// 该对象最多只允许 `0`, `1` 值, 分别代表背景和骨骼.
            impl ImgDisplay for $slice {
                /// 为了获得更清晰的可视化对象, 该功能在展示前将背景/骨骼
                /// 体素分别映射为黑色/白色.
                fn show(&self) {
                    let view = self.array_view();
                    let mat = mask_slice_to_opencv_mat(view.as_slice().unwrap(), self.shape());
                    imshow("knee-berry mask slice", &mat).unwrap();
                }
            }
        )+
    };
}

macro_rules! impl_scan_display {
    ($($scan: ty),+) => {
        $(
            /// 以骨骼窗口 (窗位 450, 窗宽 1500) 规范化后展示.
            impl ImgDisplay for $scan {
                fn show(&self) {
                    let mat = scan_slice_to_opencv_mat(self.data(), self.shape());
                    imshow("knee-berry scan slice", &mat).unwrap();
                }
            }
        )+
    };
}

impl_mask_display!(MaskSlice<'_>, MaskSliceMut<'_>);
impl_scan_display!(ScanSlice<'_>, ScanSliceMut<'_>);

/// 构造 `z_index` 切片的彩色叠加矩阵. mask 前景以红色叠加.
fn overlay_mat(scan: &CtScan, mask: &BoneMask, z_index: usize) -> Mat {
    const WINDOW: crate::CtWindow = crate::CtWindow::from_bone_visual();
    const ALPHA: f32 = 0.3;

    let scan_sli = scan.slice_at(z_index);
    let mask_sli = mask.slice_at(z_index);
    let (h, w) = scan_sli.shape();

    let mut mat =
        Mat::new_size_with_default(Size::new(w as i32, h as i32), CV_8UC3, Scalar::all(0.0))
            .unwrap();
    for i in 0..h {
        for j in 0..w {
            let gray = WINDOW.eval(scan_sli[(i, j)]).unwrap();
            // BGR 顺序.
            let mut bgr = [gray, gray, gray];
            if is_bone(mask_sli[(i, j)]) {
                bgr[0] = (gray as f32 * (1.0 - ALPHA)) as u8;
                bgr[1] = (gray as f32 * (1.0 - ALPHA)) as u8;
                bgr[2] = (gray as f32 * (1.0 - ALPHA) + (WHITE as f32) * ALPHA) as u8;
            }
            *mat.at_2d_mut::<Vec3b>(i as i32, j as i32).unwrap() = Vec3b::from(bgr);
        }
    }
    mat
}

/// 交互式切片浏览. 在 `[start, end)` 范围内以键盘控制上下翻页,
/// 将 mask 前景以红色叠加到扫描切片上.
///
/// 按键说明: `a`/`d` 前后翻页, `q` 或 `Esc` 退出.
///
/// 当两个输入形状不一致或范围非法时 panic.
pub fn show_overlay_scroll(scan: &CtScan, mask: &BoneMask, start: usize, end: usize) {
    assert_eq!(scan.shape(), mask.shape(), "CT 扫描和标注形状不一致");
    assert!(start < end && end <= scan.len_z(), "切片范围非法");

    let mut cur = start;
    loop {
        let mat = overlay_mat(scan, mask, cur);
        imshow("knee-berry overlay", &mat).unwrap();

        match wait_key(0).unwrap() {
            // q / Esc
            113 | 27 => break,
            // a: 上一张
            97 => cur = cur.saturating_sub(1).max(start),
            // d: 下一张
            100 => cur = (cur + 1).min(end - 1),
            _ => {}
        }
    }
}
