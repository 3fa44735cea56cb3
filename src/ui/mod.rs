pub mod render;
pub mod style;

pub use render::{Renderer, qr_lines};
