pub mod deploy;
pub mod params;
pub mod provider;
pub mod verify;

pub use deploy::DeployCommand;
pub use params::ParamsCommand;
pub use provider::ProviderCommand;
pub use verify::VerifyCommand;
