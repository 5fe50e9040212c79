#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供膝关节 3D CT 扫描文件的结构化信息和骨骼 mask 基础处理算法.
//!
//! 该 crate 目前仅提供 `safe` 接口. 将来可能为部分高性能场景关键路径提供 `unsafe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 针对单侧膝关节 CT 扫描 (nii/nii.gz 格式) 设计,
//!   但所有 mask 算法对任意二值 3D 标注都可以工作.
//! 2. 在非期望情况下, 程序会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 开发计划
//!
//! ### 阈值法骨骼分割 ✅
//!
//! 按 HU 阈值带提取骨骼, 并以 6-连通规则清理小连通域、保留最大的
//! 若干个连通域 (股骨 + 胫骨).
//!
//! 实现位于 `knee-berry/src/segment`.
//!
//! ### 三维形态学扩张 ✅
//!
//! 将 mask 沿边界向外扩张给定的物理距离 (毫米). 结构元是根据体素
//! 各向异性分辨率构造的椭球, 保证扩张在物理空间上是各向同性的.
//!
//! 实现位于 `knee-berry/src/data/morph_3d`.
//!
//! ### 边界随机化 ✅
//!
//! 基于欧氏距离变换在原 mask 外侧生成随机扰动边界. 随机源由调用方注入,
//! 给定种子时结果完全可复现.
//!
//! 实现位于 `knee-berry/src/randomize`.
//!
//! ### 内外侧标志点检测 ✅
//!
//! 沿给定方向扫描水平切片, 在第一个含骨骼前景的切片上以中心线划分
//! 内侧/外侧, 分别取 h 方向最远的体素.
//!
//! 实现位于 `knee-berry/src/landmark`.
//!
//! ### CT window 视图 ✅
//!
//! 提供一个独立的 CT 窗口对象, 以便将 CT HU 值转换为 8-bit 灰度值.
//! 默认提供适合骨骼结构的窗口.
//!
//! 实现位于 `knee-berry/src/data/window.rs`.
//!
//! ### 切片可视化 ✅
//!
//! 切片灰度图/叠加图持久化, 以及标志点渲染. `plot` feature
//! 下额外提供交互式窗口展示.
//!
//! 实现位于 `knee-berry/src/data/slice`.
//!
//! ### 完善代码文档 ⌛️
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

type Predicate = fn(u8) -> bool;

type Area3d = Vec<Idx3d>;
type Areas3d = Vec<Area3d>;

/// 3D CT nii 文件基础数据结构.
mod data;

pub use data::{
    BoneMask, CtData3d, CtScan, CtWindow, ImgWriteRaw, ImgWriteVis, MaskSlice, MaskSliceMut,
    NiftiHeaderAttr, OwnedMaskSlice, OwnedScanSlice, ScanSlice, ScanSliceMut,
};

pub use data::morph_3d::{EllipsoidKernel, ExpandError};

pub use data::slice::overlay;

pub mod consts;

#[cfg(feature = "plot")]
pub use data::slice::{show_overlay_scroll, ImgDisplay};

pub mod landmark;

pub mod randomize;

pub mod segment;

pub mod dataset;
pub mod prelude;
