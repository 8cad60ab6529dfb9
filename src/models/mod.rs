pub mod department;
pub mod employee;
pub mod user;
