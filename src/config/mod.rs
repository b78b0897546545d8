pub mod clock;
pub mod engine_config;
pub mod env;
pub mod settings;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine_config::ProcessEngineConfiguration;
pub use env::EnvConfig;
pub use settings::EngineSettings;
