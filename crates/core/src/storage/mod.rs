pub mod gateway;
pub mod json_file;
pub mod memory;
pub mod writer;
