pub mod check;
pub mod compile;
pub mod config;
pub mod inspect;
