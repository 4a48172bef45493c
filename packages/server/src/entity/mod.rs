pub mod api_token;
pub mod click_event;
pub mod shortened_url;
pub mod uploaded_item;
pub mod user;
