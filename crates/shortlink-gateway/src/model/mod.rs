mod health;
mod url;

pub use health::HealthResponse;
pub use url::{
    ClickResponse, CreateShortUrlRequest, CreateShortUrlResponse, ErrorResponse, StatsResponse,
};
