pub mod engagement;
pub mod follows;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod tokens;
pub mod users;
