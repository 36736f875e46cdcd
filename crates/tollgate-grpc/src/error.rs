use tollgate_domain::DomainError;
use tonic::Status;

/// Convert a domain error to a gRPC status.
///
/// Validation failures short-circuit as client errors; store failures are
/// the only internal errors this surface produces.
pub fn domain_error_to_status(error: DomainError) -> Status {
    match error {
        DomainError::InvalidSample(msg) | DomainError::DecodeError(msg) => {
            Status::invalid_argument(msg)
        }

        DomainError::InvoiceNotFound(unit_id) => {
            Status::not_found(format!("no invoice for unit {unit_id}"))
        }

        DomainError::StoreError(err) => Status::internal(format!("store error: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn invalid_sample_maps_to_invalid_argument() {
        let status = domain_error_to_status(DomainError::InvalidSample("bad".to_string()));
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let status = domain_error_to_status(DomainError::InvoiceNotFound(7));
        assert_eq!(status.code(), Code::NotFound);
        assert!(status.message().contains('7'));
    }

    #[test]
    fn store_error_maps_to_internal() {
        let status = domain_error_to_status(DomainError::StoreError(anyhow::anyhow!("disk full")));
        assert_eq!(status.code(), Code::Internal);
    }
}
