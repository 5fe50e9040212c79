//! 检测各 mask 最低切片上的内外侧标志点, 汇总为 CSV 报告.
//!
//! 批量处理结果目录下的全部 mask 文件. 单个 mask 失败不会中止批处理,
//! 而是在报告中记录错误标记后继续下一项.

use knee_berry::dataset::knee::{self, LANDMARK_REPORT_FILENAME};
use knee_berry::prelude::*;
use log::{info, warn};
use serde::Serialize;

/// 报告中的一行. 坐标列在检测失败时填充 `Error` 标记.
#[derive(Serialize)]
struct LandmarkRow {
    #[serde(rename = "Mask")]
    mask: String,
    #[serde(rename = "Medial_X")]
    medial_x: String,
    #[serde(rename = "Medial_Y")]
    medial_y: String,
    #[serde(rename = "Medial_Z")]
    medial_z: String,
    #[serde(rename = "Lateral_X")]
    lateral_x: String,
    #[serde(rename = "Lateral_Y")]
    lateral_y: String,
    #[serde(rename = "Lateral_Z")]
    lateral_z: String,
}

impl LandmarkRow {
    /// 由检测出的 `(内侧点, 外侧点)` 构造一行. 点为内部 (z, h, w)
    /// 三元组, 报告列按 (X, Y, Z) = (w, h, z) 输出.
    fn from_points(label: String, (medial, lateral): (Idx3d, Idx3d)) -> Self {
        Self {
            mask: label,
            medial_x: medial.2.to_string(),
            medial_y: medial.1.to_string(),
            medial_z: medial.0.to_string(),
            lateral_x: lateral.2.to_string(),
            lateral_y: lateral.1.to_string(),
            lateral_z: lateral.0.to_string(),
        }
    }

    /// 构造一个错误标记行.
    fn from_error(label: String) -> Self {
        let e = || "Error".to_owned();
        Self {
            mask: label,
            medial_x: e(),
            medial_y: e(),
            medial_z: e(),
            lateral_x: e(),
            lateral_y: e(),
            lateral_z: e(),
        }
    }
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let data_dir = utils::loader::knee_dir_from_env_or_home();
    let results_dir = utils::loader::results_dir_from_env_or_home();

    // CT 只加载一次, 供标志点渲染复用.
    let scan = CtScan::open(knee::scan_path(&data_dir)).ok();

    let mut writer = csv::Writer::from_path(results_dir.join(LANDMARK_REPORT_FILENAME))
        .expect("无法创建报告文件");

    for (kind, mask) in knee::mask_loader(knee::default_report_kinds(), &results_dir) {
        let label = kind.label();
        info!("处理 {label}...");

        let mask = match mask {
            Ok(mask) => mask,
            Err(e) => {
                warn!("  加载 mask 失败: {e}");
                writer
                    .serialize(LandmarkRow::from_error(label))
                    .expect("写入报告失败");
                continue;
            }
        };

        let row = match mask.lowest_medial_lateral(ScanOrder::Descending) {
            Ok((medial, lateral)) => {
                info!("  内侧点: {medial:?}");
                info!("  外侧点: {lateral:?}");
                if let Some(scan) = &scan {
                    render_landmarks(scan, &label, medial, lateral, &results_dir);
                }
                LandmarkRow::from_points(label, (medial, lateral))
            }
            Err(e) => {
                warn!("  标志点检测失败: {e}");
                LandmarkRow::from_error(label)
            }
        };
        writer.serialize(row).expect("写入报告失败");
    }

    writer.flush().expect("写入报告失败");
    utils::sep();
    info!("标志点报告已保存到 {:?}", results_dir.join(LANDMARK_REPORT_FILENAME));
}

/// 在选中切片上渲染两个标志点并保存 PNG.
fn render_landmarks(
    scan: &CtScan,
    label: &str,
    medial: Idx3d,
    lateral: Idx3d,
    results_dir: &std::path::Path,
) {
    let z = medial.0;
    if z >= scan.len_z() {
        warn!("  切片索引 {z} 超出扫描范围, 跳过渲染");
        return;
    }
    overlay::save_landmarks(
        &scan.slice_at(z),
        &[(medial.1, medial.2), (lateral.1, lateral.2)],
        results_dir.join(format!("landmarks_{label}.png")),
    )
    .expect("保存标志点渲染失败");
}
