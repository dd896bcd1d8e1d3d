pub mod app;
pub mod asset;
pub mod error;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod time;

pub use app::{run_application, RenderApplication, StartupContext, UpdateContext};
pub use error::Error;

pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
