//! ivr-twilio: Twilio REST client and webhook signatures
//!
//! The REST client is used by the provisioning commands only; the webhook
//! path never calls out to Twilio.

pub mod client;
pub mod error;
pub mod signature;

pub use client::{Account, AvailableNumber, IncomingNumber, NumberSearch, PurchaseRequest, TwilioClient};
pub use error::{Result, TwilioError};
pub use signature::{compute_signature, verify_signature, SIGNATURE_HEADER};
