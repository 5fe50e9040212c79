//! 切片叠加渲染.
//!
//! 将 mask 或标志点以彩色叠加到 CT 切片灰度图上并保存为 PNG,
//! 以便人工检查分割/扩张/随机化的效果.

use crate::consts::gray::*;
use crate::{CtWindow, Idx2d, MaskSlice, ScanSlice};
use image::{ImageResult, Rgb, RgbImage};
use std::path::Path;

/// mask 叠加的不透明度.
const MASK_ALPHA: f32 = 0.3;

/// 标志点十字标记的臂长 (像素).
const MARK_ARM: usize = 3;

/// 以骨骼 CT 窗口将扫描切片渲染成灰度 RGB 底图.
fn scan_to_rgb(scan: &ScanSlice) -> RgbImage {
    const WINDOW: CtWindow = CtWindow::from_bone_visual();

    let (height, width) = scan.shape();
    let mut buf = RgbImage::new(width as u32, height as u32);
    for ((h, w), &hu) in scan.indexed_iter() {
        let gray = WINDOW.eval(hu).unwrap();
        buf.put_pixel(w as u32, h as u32, Rgb([gray, gray, gray]));
    }
    buf
}

/// `alpha` 混合单个通道.
#[inline]
fn blend(base: u8, tint: u8, alpha: f32) -> u8 {
    (base as f32 * (1.0 - alpha) + tint as f32 * alpha) as u8
}

/// 在 `buf` 上以 `tint` 颜色、`MASK_ALPHA` 不透明度染出 mask 的前景区域.
fn paint_mask(buf: &mut RgbImage, mask: &MaskSlice, tint: [u8; 3]) {
    for ((h, w), &pix) in mask.indexed_iter() {
        if !is_bone(pix) {
            continue;
        }
        let Rgb([r, g, b]) = *buf.get_pixel(w as u32, h as u32);
        buf.put_pixel(
            w as u32,
            h as u32,
            Rgb([
                blend(r, tint[0], MASK_ALPHA),
                blend(g, tint[1], MASK_ALPHA),
                blend(b, tint[2], MASK_ALPHA),
            ]),
        );
    }
}

/// 在 `buf` 的 `(h, w)` 位置画一个红色十字标记.
fn paint_cross(buf: &mut RgbImage, (h, w): Idx2d) {
    let (height, width) = (buf.height() as usize, buf.width() as usize);
    for d in 0..=MARK_ARM {
        for (hh, ww) in [
            (h.wrapping_sub(d), w),
            (h.saturating_add(d), w),
            (h, w.wrapping_sub(d)),
            (h, w.saturating_add(d)),
        ] {
            if hh < height && ww < width {
                buf.put_pixel(ww as u32, hh as u32, Rgb([WHITE, BLACK, BLACK]));
            }
        }
    }
}

/// 将单个 mask 以红色叠加到扫描切片上, 保存为 `path` 处的 PNG.
///
/// 当扫描切片与 mask 切片形状不一致时 panic.
pub fn save_overlay<P: AsRef<Path>>(
    scan: &ScanSlice,
    mask: &MaskSlice,
    path: P,
) -> ImageResult<()> {
    assert_eq!(scan.shape(), mask.shape(), "扫描与 mask 切片形状不一致");

    let mut buf = scan_to_rgb(scan);
    paint_mask(&mut buf, mask, [WHITE, BLACK, BLACK]);
    buf.save(path)
}

/// 将两个 mask 分别以红色/蓝色叠加到扫描切片上, 保存为 `path` 处的 PNG.
/// 常用于对比原 mask 与扩张/随机化后的 mask.
///
/// 当任一 mask 切片与扫描切片形状不一致时 panic.
pub fn save_overlay2<P: AsRef<Path>>(
    scan: &ScanSlice,
    mask1: &MaskSlice,
    mask2: &MaskSlice,
    path: P,
) -> ImageResult<()> {
    assert_eq!(scan.shape(), mask1.shape(), "扫描与 mask 切片形状不一致");
    assert_eq!(scan.shape(), mask2.shape(), "扫描与 mask 切片形状不一致");

    let mut buf = scan_to_rgb(scan);
    paint_mask(&mut buf, mask2, [BLACK, BLACK, WHITE]);
    paint_mask(&mut buf, mask1, [WHITE, BLACK, BLACK]);
    buf.save(path)
}

/// 将一组 `(h, w)` 标志点以红色十字渲染到扫描切片上, 保存为 `path` 处的 PNG.
pub fn save_landmarks<P: AsRef<Path>>(
    scan: &ScanSlice,
    points: &[Idx2d],
    path: P,
) -> ImageResult<()> {
    let mut buf = scan_to_rgb(scan);
    for &pos in points {
        paint_cross(&mut buf, pos);
    }
    buf.save(path)
}
