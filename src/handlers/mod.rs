pub mod auth;
pub mod department;
pub mod employee;
