pub mod files;
pub mod health;
pub mod redirect;
pub mod tokens;
pub mod uploads;
pub mod urls;
