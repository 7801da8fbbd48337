pub mod gallery;
pub mod passkey;
pub mod photo;
pub mod session;
pub mod settings;
pub mod user;

pub use gallery::GalleryService;
pub use passkey::PasskeyService;
pub use photo::PhotoService;
pub use session::SessionService;
pub use settings::SettingsService;
pub use user::UserService;
