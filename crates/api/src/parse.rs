// SPDX-License-Identifier: MIT

//! Parse a query-string status value using each enum's own `snake_case`
//! serde representation, rather than duplicating the match arms `sf-storage`
//! keeps private to its row-mapping module.

use crate::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use sf_core::DomainError;

pub fn parse_status<T: DeserializeOwned>(field: &'static str, raw: &str) -> ApiResult<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| ApiError::Domain(DomainError::Validation(format!("invalid {field}: {raw}"))))
}
