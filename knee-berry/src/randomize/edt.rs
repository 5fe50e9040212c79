//! 各向异性欧氏距离变换.
//!
//! 采用逐轴抛物线下包络法计算平方距离场, 每个轴以该轴体素分辨率的
//! 平方为权重, 因此结果直接以物理 (毫米) 单位度量.

use crate::consts::gray::*;
use ndarray::{Array3, ArrayView3, Axis};

/// 有限 "无穷大". 距离变换的经典实现用大的有限值代替真正的
/// `f64::INFINITY`, 以保持抛物线交点的算术有效.
const INF: f64 = 1e20;

/// 判定一个平方距离是否来自 "不存在前景" 的哨兵值.
const SENTINEL: f64 = 1e19;

/// 一维平方距离变换 (下包络法).
///
/// `f` 为输入平方距离, `w` 为该轴体素间距的平方, 结果写入 `d`.
/// `v` 与 `z` 是由调用方复用的工作区, 长度分别至少为 `f.len()` 和
/// `f.len() + 1`.
fn dt_1d(f: &[f64], w: f64, d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    debug_assert!(n >= 1);

    let mut k = 0usize;
    v[0] = 0;
    z[0] = -INF;
    z[1] = INF;

    for q in 1..n {
        loop {
            let p = v[k];
            // 抛物线 q 与抛物线 p 的交点横坐标.
            let s = ((f[q] + w * (q * q) as f64) - (f[p] + w * (p * p) as f64))
                / (2.0 * w * (q - p) as f64);
            if s <= z[k] && k > 0 {
                k -= 1;
                continue;
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = INF;
            break;
        }
    }

    k = 0;
    for (q, slot) in d.iter_mut().enumerate().take(n) {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        *slot = w * (q.abs_diff(p) * q.abs_diff(p)) as f64 + f[p];
    }
}

/// 计算二值 mask 补集的平方欧氏距离变换.
///
/// 返回值与 `mask` 同形状: 前景体素处为 0, 背景体素处为它到最近前景
/// 体素的平方物理距离 (平方毫米). 若 mask 完全为空, 则所有值都不小于
/// [`SENTINEL`].
///
/// `pix_dim` 以 \[z, h, w\] 顺序给出, 分量必须为正 (由调用方保证).
pub(crate) fn squared_edt_3d(mask: ArrayView3<u8>, pix_dim: [f64; 3]) -> Array3<f64> {
    let mut g = mask.mapv(|p| if is_bone(p) { 0.0 } else { INF });

    for (axis, s) in pix_dim.iter().enumerate() {
        let w = s * s;
        let n = g.len_of(Axis(axis));

        let mut f = vec![0.0; n];
        let mut d = vec![0.0; n];
        let mut v = vec![0usize; n];
        let mut z = vec![0.0; n + 1];

        for mut lane in g.lanes_mut(Axis(axis)) {
            for (slot, val) in f.iter_mut().zip(lane.iter()) {
                *slot = *val;
            }
            dt_1d(&f, w, &mut d, &mut v, &mut z);
            for (slot, val) in lane.iter_mut().zip(d.iter()) {
                *slot = *val;
            }
        }
    }
    g
}

/// 将平方距离场开方为毫米距离场. 哨兵值映射为 `f64::INFINITY`.
pub(crate) fn sqrt_field(squared: Array3<f64>) -> Array3<f64> {
    squared.mapv_into(|v| if v >= SENTINEL { f64::INFINITY } else { v.sqrt() })
}
