//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 二值 mask 中, 背景的体素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 二值 mask 中, 骨骼前景的体素值.
    pub const MASK_BONE: u8 = 1;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道暗灰色.
    pub const DARK_GRAY: u8 = 0b_0100_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道亮灰色.
    pub const LIGHT_GRAY: u8 = 0b_1100_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 体素是否是骨骼前景?
    #[inline]
    pub const fn is_bone(p: u8) -> bool {
        matches!(p, MASK_BONE)
    }

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }
}

/// 骨骼阈值分割的默认 HU 下界 (不含).
pub const BONE_HU_LOWER: f32 = 250.0;

/// 骨骼阈值分割的默认 HU 上界 (不含).
pub const BONE_HU_UPPER: f32 = 3000.0;

/// 清理小连通域时的默认体素数下限.
pub const DEFAULT_MIN_COMPONENT: usize = 1000;

/// 膝关节扫描中需要保留的最大连通域个数 (股骨 + 胫骨).
pub const KNEE_BONE_COMPONENTS: usize = 2;
