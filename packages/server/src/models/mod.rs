pub mod shared;
pub mod token;
pub mod upload;
pub mod url;
