pub mod job;
pub mod scan;
