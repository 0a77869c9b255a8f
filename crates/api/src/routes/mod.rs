pub mod health;
pub mod keychain;
