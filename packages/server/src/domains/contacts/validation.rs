//! Phone number parsing shared by validation, dispatch and provider
//! registration.

use anyhow::Result;
use phonenumber::{Mode, ParseError};

use crate::common::WorkerPool;
use crate::domains::contacts::data::NumberValidation;

/// Parse an international number and format it as E.164 (`+14155550100`).
///
/// No default region is assumed, so the number must carry its country code.
pub fn normalize_e164(raw: &str) -> Result<String, ParseError> {
    let number = phonenumber::parse(None, raw.trim())?;
    Ok(number.format().mode(Mode::E164).to_string())
}

pub fn validate_one(number: String) -> NumberValidation {
    match normalize_e164(&number) {
        Ok(_) => NumberValidation {
            number,
            is_valid: true,
            error_message: None,
        },
        Err(e) => NumberValidation {
            number,
            is_valid: false,
            error_message: Some(e.to_string()),
        },
    }
}

/// Validate every number on the pool. The output has the same length and
/// order as `numbers`.
pub async fn validate_many(pool: &WorkerPool, numbers: Vec<String>) -> Result<Vec<NumberValidation>> {
    pool.run(numbers, |number| async move { validate_one(number) })
        .await
}
