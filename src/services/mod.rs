pub mod observer;
pub mod scheduler;
pub mod storage;
pub mod vision;
pub mod worker;
