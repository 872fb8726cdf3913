/// Runtime configuration from environment variables

pub mod settings;
pub mod wallet;

pub use settings::Settings;
pub use wallet::load_keypair;
