//! Phone-number validation.
//!
//! The roots form accepts any number libphonenumber considers valid.
//! National numbers without a country code are read in the bot's home
//! region. Validation sits behind [`PhoneValidator`] so handlers never
//! depend on a particular numbering plan.

use phonenumber::country;

/// Decides whether a token is an acceptable phone number.
pub trait PhoneValidator: Send + Sync {
    /// Region code the validator interprets national numbers in.
    fn region(&self) -> &str;

    fn is_valid(&self, candidate: &str) -> bool;
}

/// Validator with Russia as the default region.
///
/// `89161234567` parses as a Russian number with trunk prefix `8`;
/// numbers with an explicit `+` country code are checked against their
/// own region's metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct RussianPhoneValidator;

impl RussianPhoneValidator {
    pub fn new() -> Self {
        Self
    }
}

impl PhoneValidator for RussianPhoneValidator {
    fn region(&self) -> &str {
        "RU"
    }

    fn is_valid(&self, candidate: &str) -> bool {
        match phonenumber::parse(Some(country::Id::RU), candidate) {
            Ok(number) => phonenumber::is_valid(&number),
            Err(e) => {
                tracing::debug!(error = %e, "Phone candidate did not parse");
                false
            }
        }
    }
}
