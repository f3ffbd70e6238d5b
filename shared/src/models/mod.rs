pub mod pixel;
pub mod resolution;
pub mod tile;
