//! Recipe Box Common Types
//!
//! Wire types shared by the API gateway and its clients.

pub mod account;
pub mod recipe;

pub use account::{
    CheckSessionRequest, LoginRequest, MessageResponse, SignoutRequest, SignupRequest,
    SignupResponse, TokenRequest, TokenResponse, UserDetails,
};
pub use recipe::{AddRecipeRequest, AddRecipeResponse, FavoritesResponse, SaveFavoritesRequest};
