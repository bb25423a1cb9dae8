pub mod assets;
pub mod blog;
pub mod collection;
pub mod config;
pub mod docs;
pub mod highlight;
pub mod inject;
pub mod markdown;
pub mod pages;
pub mod parser;
pub mod reference;
pub mod renderer;
pub mod site;
pub mod static_files;
pub mod template;

// Re-export main types
pub use config::{Config, ConfigError};
pub use parser::{Content, ParseError, Parser};
pub use renderer::{Registry, RenderContext, RenderError, Renderable};
pub use site::{BuildError, Site, SiteBuilder};
pub use template::{TemplateError, TemplateRenderer};
