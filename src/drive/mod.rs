//! Client-side model of the remote drive: the fetched tree, the user's
//! position in it, the context selection, and the actions that change it.

pub mod mutation;
pub mod navigation;
pub mod selection;
pub mod transfer;
pub mod tree;
