// SPDX-License-Identifier: MIT

//! Mapping from [`sf_core::DomainError`] to wire-level error responses
//! (spec.md §7).

use serde::{Deserialize, Serialize};
use sf_core::DomainError;

/// The JSON body returned alongside the mapped HTTP status for any
/// non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl ErrorResponse {
    pub fn from_domain(err: &DomainError) -> Self {
        Self { error: err.to_string(), status: err.kind().http_status() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_409() {
        let err = DomainError::ScoutRunActive;
        let resp = ErrorResponse::from_domain(&err);
        assert_eq!(resp.status, 409);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = DomainError::NotFound { entity: "strategy", id: "abc".into() };
        let resp = ErrorResponse::from_domain(&err);
        assert_eq!(resp.status, 404);
    }
}
