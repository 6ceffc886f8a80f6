// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Unit tests for metrics recording and exposition.

#[cfg(test)]
mod tests {
    use crate::metrics::{
        gather, observe_time_to_admission, record_certificate_issued,
        record_certificate_requested, record_reconciliation_error,
        record_reconciliation_success,
    };
    use std::time::Duration;

    #[test]
    fn test_reconciliation_metrics_are_exposed() {
        record_reconciliation_success("Ingress", Duration::from_millis(25));
        record_reconciliation_error("Route");

        let output = gather();
        assert!(output.contains("glbc_dev_reconciliations_total"));
        assert!(output.contains("glbc_dev_reconciliation_duration_seconds"));
    }

    #[test]
    fn test_certificate_metrics_are_exposed() {
        record_certificate_requested();
        record_certificate_issued();

        let output = gather();
        assert!(output.contains("glbc_dev_tls_certificate_requests_total"));
        assert!(output.contains("glbc_dev_tls_certificate_issued_total"));
    }

    #[test]
    fn test_time_to_admission_ignores_negative_values() {
        observe_time_to_admission(12.5);
        observe_time_to_admission(-3.0);

        let output = gather();
        assert!(output.contains("glbc_dev_object_time_to_admission_seconds"));
    }
}
