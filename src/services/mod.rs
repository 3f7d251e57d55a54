pub mod ecb;
pub mod mailer;
pub mod secrets;
