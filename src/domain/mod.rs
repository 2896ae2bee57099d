pub mod destination;
pub mod message;
pub mod otp;
