pub mod chat;
pub mod console;
pub mod email;
pub mod push;
pub mod sms;
