pub mod errors;
pub mod events;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod state;

pub use errors::AetherError;
pub use models::Target;
pub use profile::ScanProfile;
pub use state::Session;
