//! 在原 mask 与扩张边界之间生成随机化 mask.
//!
//! 对原始骨骼 mask 以 2mm 为最大距离做两次独立的边界随机化
//! (各自使用固定种子, 结果可复现), 并保存对比叠加图.

use knee_berry::dataset::knee::{self, MaskKind};
use knee_berry::prelude::*;
use log::info;
use ordered_float::OrderedFloat;

/// 随机化的最大物理距离 (毫米).
const MAX_DISTANCE_MM: f64 = 2.0;

/// 两次随机化各自的编号与种子.
const RUNS: [(u32, u64); 2] = [(1, 42), (2, 123)];

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let results_dir = utils::loader::results_dir_from_env_or_home();
    let mask = BoneMask::open(knee::mask_path(&results_dir, MaskKind::Original))
        .expect("打开原始 mask 失败");

    let field = mask.distance_field_mm().expect("距离场计算失败");
    let reach = field
        .iter()
        .copied()
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(OrderedFloat)
        .max();
    if let Some(OrderedFloat(d)) = reach {
        info!("mask 外侧最远体素距离: {d:.2}mm");
    }

    let mut first = None;
    for (n, seed) in RUNS {
        let randomized = mask
            .randomized(MAX_DISTANCE_MM, Some(seed))
            .expect("mask 随机化失败");
        info!(
            "随机化 #{} (种子 {}) 完成, 骨骼体素: {} -> {}",
            n,
            seed,
            mask.bone_count(),
            randomized.bone_count()
        );
        randomized
            .save(knee::mask_path(&results_dir, MaskKind::Randomized(n)))
            .expect("保存随机化 mask 失败");
        first.get_or_insert(randomized);
    }

    // 保存原 mask 与第一次随机化结果的对比叠加图. 没有扫描数据时
    // 以原始 mask 所在目录的扫描为底图, 缺失则跳过.
    let scan_path = knee::scan_path(utils::loader::knee_dir_from_env_or_home());
    match (CtScan::open(&scan_path), first) {
        (Ok(scan), Some(randomized)) => {
            let mid = scan.len_z() / 2;
            overlay::save_overlay2(
                &scan.slice_at(mid),
                &mask.slice_at(mid),
                &randomized.slice_at(mid),
                results_dir.join("randomize_overlay.png"),
            )
            .expect("保存叠加图失败");
        }
        _ => info!("未找到 {scan_path:?}, 跳过叠加图"),
    }

    utils::sep();
    info!("随机化结果已保存到 {:?}", results_dir);
}
