pub mod broadcast;
pub mod messages;
pub mod presence;
