pub mod recipe;
pub mod user;

pub use recipe::RecipeRecord;
pub use user::UserRecord;
