//! Integer status codes returned across the JNI boundary

use rubicon_bridge::error::STATUS_OK;
use rubicon_bridge::{RunError, StartError};

/// Status for `Python.init`: 0, or a negative code per failure point
pub fn start_status(result: &Result<(), StartError>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(e) => e.status_code(),
    }
}

/// Status for `Python.run`: 0, or nonzero on any failure
pub fn run_status(result: &Result<(), RunError>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(e) => e.status_code(),
    }
}
