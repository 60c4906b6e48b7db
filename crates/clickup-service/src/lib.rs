mod http;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;
mod traits;

pub use http::{HttpService, DEFAULT_BASE_URL};
pub use traits::{ByteStream, ClickUpService, ServiceError};
