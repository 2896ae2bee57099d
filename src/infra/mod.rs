pub mod apns;
pub mod aws;
pub mod email;
pub mod firebase;
pub mod memory_store;
pub mod otp_store;
pub mod sms;
