use crate::error::{DomainError, DomainResult};
use garde::{Report, Validate};

/// Run garde validation and fold the report into a `DomainError`.
pub fn validate_struct<T>(input: &T) -> DomainResult<()>
where
    T: Validate,
    T::Context: Default,
{
    input
        .validate()
        .map_err(|report| DomainError::ValidationError(flatten_report(&report)))
}

fn flatten_report(report: &Report) -> String {
    report
        .iter()
        .map(|(path, error)| {
            let path = path.to_string();
            if path.is_empty() {
                error.message().to_string()
            } else {
                format!("{path}: {}", error.message())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[garde(length(min = 1))]
        device_id: String,
    }

    #[test]
    fn valid_input_passes() {
        let sample = Sample {
            device_id: "truck-1".to_string(),
        };
        assert!(validate_struct(&sample).is_ok());
    }

    #[test]
    fn invalid_input_names_the_offending_field() {
        let sample = Sample {
            device_id: String::new(),
        };
        match validate_struct(&sample) {
            Err(DomainError::ValidationError(msg)) => assert!(msg.contains("device_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
