//! Outer surface around the reasoning core: case files, admission logs and
//! experiment sampling

pub mod admission_log;
pub mod records;
pub mod sampling;
