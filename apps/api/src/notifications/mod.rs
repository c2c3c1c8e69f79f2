pub mod handlers;
pub mod inbox;
