pub mod employee;
pub mod material;
pub mod teacher;
