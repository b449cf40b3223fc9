pub mod buffer;
pub mod renderer;
