pub mod auth;
pub mod gallery;
pub mod health;
pub mod passkey;
pub mod photo;
pub mod settings;
pub mod upload;
