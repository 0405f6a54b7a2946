mod health;
mod url;

pub use health::{health_handler, not_found_handler};
pub use url::{create_short_url_handler, redirect_handler, stats_handler};
