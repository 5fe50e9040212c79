//! CT scan/mask 切片对象的操作.

mod core;
pub mod overlay;
mod save;

pub use core::{
    MaskSlice, MaskSliceMut, OwnedMaskSlice, OwnedScanSlice, ScanSlice, ScanSliceMut,
};

pub use save::{ImgWriteRaw, ImgWriteVis};

cfg_if::cfg_if! {
    if #[cfg(feature = "plot")] {
        mod plot;

        pub use plot::{show_overlay_scroll, ImgDisplay};
    }
}
