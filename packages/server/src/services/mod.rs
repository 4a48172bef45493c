//! Request-neutral operations. The HTTP layer is a thin adapter over these.

mod error;
pub mod shortener;
pub mod tokens;
pub mod upload;

pub use error::ServiceError;
pub use shortener::{ClickRecorder, CreateShortUrl, CreatedShortUrl, RequestInfo, ShortenerService};
pub use tokens::{Authenticated, IssuedToken, TokenService};
pub use upload::{Page, ResolvedFile, UploadRequest, UploadService, UploadedFile};
