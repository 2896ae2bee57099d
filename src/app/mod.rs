pub mod dispatcher;
pub mod notes;
pub mod otp;
