pub mod driver;
pub mod passenger;
pub mod result;
