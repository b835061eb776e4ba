//! Frame-level passes built on top of the [`Renderer`](crate::renderer::Renderer).

pub mod depth_merge;
pub mod draw;
pub mod wboit;

pub use depth_merge::{DepthMergePass, DepthSample, merge_texel, pack_depth, unpack_depth};
pub use draw::DrawPass;
pub use wboit::{OrderIndependentTransparency, WboitPass, WboitTexel};
