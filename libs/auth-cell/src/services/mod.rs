pub mod account;
pub mod firebase;

pub use account::AccountService;
pub use firebase::{FirebaseAuthClient, IdentityError, IdentityProvider};
