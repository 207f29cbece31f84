pub mod filesystem;
pub mod gesture;
pub mod process;
