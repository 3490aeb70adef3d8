pub mod catalog;
pub mod direction;
pub mod operator;
