pub mod booking;
pub mod pool;
pub mod region;
