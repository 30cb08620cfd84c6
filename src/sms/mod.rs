pub mod twilio;

pub use twilio::{SendResult, TwilioClient};
