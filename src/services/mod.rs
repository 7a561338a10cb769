pub mod lifecycle;
pub mod registry;
pub mod storage;
pub mod sweeper;
pub mod webhook;
