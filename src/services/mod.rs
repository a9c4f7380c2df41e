pub mod compiler;
pub mod storage;
