//! 股骨与胫骨阈值分割.
//!
//! 从原始膝关节 CT 扫描按 HU 阈值带提取骨骼, 清理小连通域后仅保留
//! 最大的两个连通域, 并将得到的二值 mask 保存到结果目录.

use knee_berry::consts::{
    BONE_HU_LOWER, BONE_HU_UPPER, DEFAULT_MIN_COMPONENT, KNEE_BONE_COMPONENTS,
};
use knee_berry::dataset::knee::{self, MaskKind};
use knee_berry::prelude::*;
use log::info;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let data_dir = utils::loader::knee_dir_from_env_or_home();
    let results_dir = utils::loader::results_dir_from_env_or_home();
    std::fs::create_dir_all(&results_dir).expect("无法创建结果目录");

    let scan = CtScan::open(knee::scan_path(&data_dir)).expect("打开膝关节扫描失败");
    info!("扫描加载完成, 形状: {:?}, 体素: {:?}mm", scan.shape(), scan.pix_dim());

    let mask = scan.threshold_mask(BONE_HU_LOWER, BONE_HU_UPPER);
    info!("阈值分割完成, 骨骼体素: {}", mask.bone_count());

    let mask = mask.cleaned_components(DEFAULT_MIN_COMPONENT);
    let mask = mask.largest_components(KNEE_BONE_COMPONENTS);
    info!(
        "连通域筛选完成, 骨骼体素: {}, 平均 HU: {:.1}",
        mask.bone_count(),
        scan.mean_hu(mask.bone_pos())
    );

    mask.save(knee::mask_path(&results_dir, MaskKind::Original))
        .expect("保存原始 mask 失败");

    // 保存中间切片的叠加图以供人工检查.
    let mid = scan.len_z() / 2;
    overlay::save_overlay(
        &scan.slice_at(mid),
        &mask.slice_at(mid),
        results_dir.join("segment_overlay.png"),
    )
    .expect("保存叠加图失败");

    utils::sep();
    info!("分割结果已保存到 {:?}", results_dir);
}
