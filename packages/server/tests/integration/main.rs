mod common;

mod health;
mod tokens;
mod uploads;
mod urls;
mod users;
mod worker;
