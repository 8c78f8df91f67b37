use axum::extract::Extension;

use crate::common::AppResult;
use crate::domains::contacts::{validate_many, NumberValidation, ValidateNumbersInput};
use crate::server::app::AppState;
use crate::server::extract::AppJson;
use crate::server::middleware::AuthUser;
use crate::server::response::Data;

/// Validate a batch of numbers; one entry per input, in input order.
pub async fn validate_numbers_handler(
    Extension(state): Extension<AppState>,
    _user: AuthUser,
    AppJson(input): AppJson<ValidateNumbersInput>,
) -> AppResult<Data<Vec<NumberValidation>>> {
    let results = validate_many(&state.deps.validation_pool, input.numbers).await?;
    Ok(Data::new(results))
}
