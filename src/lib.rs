//! Search a Gmail inbox and text a summary of the matches via Twilio.

pub mod app;
pub mod auth;
pub mod compose;
pub mod config;
pub mod domain;
pub mod error;
pub mod mail;
pub mod sms;

pub use error::{Error, Result};
