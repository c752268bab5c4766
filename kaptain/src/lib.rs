pub mod api;
pub mod assets;
pub mod cli;
pub mod client;
pub mod commands;
pub mod constants;
pub mod inflator;
pub mod kubeconfig;
pub mod kubectl;
pub mod pki;
pub mod registry;
pub mod renderer;
pub mod store;
pub mod utils;
pub mod version;

pub use cli::{Cli, Commands, LogLevel};
use rust_embed::RustEmbed;

/// Embeds the contents of the `assets/` directory into the binary
///
/// This struct contains the per-version asset manifests, the node file
/// templates and the addon manifests applied during cluster bootstrap
#[derive(RustEmbed)]
#[folder = "assets/"]
#[prefix = "assets/"]
pub struct Assets;
