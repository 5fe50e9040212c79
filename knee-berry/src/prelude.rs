//! 🦴欢迎光临🍒
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::slice::{
    ImgWriteVis, MaskSlice, MaskSliceMut, OwnedMaskSlice, OwnedScanSlice, ScanSlice, ScanSliceMut,
};
pub use crate::data::slice::overlay;
pub use crate::data::window::CtWindow;
pub use crate::data::{BoneMask, CtData3d, CtScan, NiftiHeaderAttr};

#[cfg(feature = "plot")]
pub use crate::data::slice::ImgDisplay;

pub use crate::consts::gray::{MASK_BACKGROUND, MASK_BONE};
pub use crate::consts::{BONE_HU_LOWER, BONE_HU_UPPER};

pub use crate::data::morph_3d::{EllipsoidKernel, ExpandError};
pub use crate::landmark::{LandmarkError, ScanOrder};
pub use crate::randomize::RandomizeError;

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, knee};
