//! 将分割 mask 沿边界向外扩张指定毫米数.
//!
//! 对原始骨骼 mask 分别扩张 2mm 与 4mm, 结果保存到结果目录.

use knee_berry::dataset::knee::{self, MaskKind};
use knee_berry::prelude::*;
use log::info;

/// 需要产出的扩张距离 (毫米).
const EXPAND_MM: [u32; 2] = [2, 4];

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let results_dir = utils::loader::results_dir_from_env_or_home();
    let mask = BoneMask::open(knee::mask_path(&results_dir, MaskKind::Original))
        .expect("打开原始 mask 失败");
    info!("原始 mask 加载完成, 骨骼体素: {}", mask.bone_count());

    for mm in EXPAND_MM {
        let expanded = mask.expanded_mm(mm as f64).expect("mask 扩张失败");
        info!(
            "扩张 {}mm 完成, 骨骼体素: {} -> {}",
            mm,
            mask.bone_count(),
            expanded.bone_count()
        );
        expanded
            .save(knee::mask_path(&results_dir, MaskKind::ExpandedMm(mm)))
            .expect("保存扩张 mask 失败");
    }

    utils::sep();
    info!("扩张结果已保存到 {:?}", results_dir);
}
