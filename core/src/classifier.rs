//! Response classification.
//!
//! `classify` decides everything that does not depend on who receives the
//! result: transport failures, empty responses, and non-2xx statuses. A 2xx
//! response is left undecoded as `Accepted`, because decoding the success
//! payload is the outcome sink's job (the default completion decodes `T`; a
//! custom handler decodes whatever it wants).
//!
//! The cancellation check happens before this runs, under the request's
//! lifecycle lock.

use serde::de::DeserializeOwned;

use crate::decoder::Decoder;
use crate::error::RequestError;
use crate::http::{StatusInfo, TransportOutcome};

/// A decoded success payload together with the bytes it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload<T> {
    pub value: T,
    pub raw: Vec<u8>,
}

/// What a completion receives.
pub type ApiResult<T, E> = Result<Payload<T>, RequestError<E>>;

#[derive(Debug)]
pub(crate) enum Classification<E> {
    /// 2xx with a body, not yet decoded.
    Accepted { status: StatusInfo, body: Vec<u8> },
    /// Terminal failure. `body` carries whatever bytes the transport returned.
    Rejected {
        error: RequestError<E>,
        body: Option<Vec<u8>>,
    },
}

impl<E> Classification<E> {
    pub(crate) fn rejected(error: RequestError<E>) -> Self {
        Classification::Rejected { error, body: None }
    }
}

pub(crate) fn classify<E: DeserializeOwned>(
    outcome: TransportOutcome,
    decoder: &Decoder,
) -> Classification<E> {
    let TransportOutcome {
        body,
        status,
        error,
    } = outcome;

    if let Some(error) = error {
        return Classification::Rejected {
            error: RequestError::ConnectionError(error),
            body,
        };
    }

    let (Some(body), Some(status)) = (body, status) else {
        return Classification::rejected(RequestError::EmptyServerResponse);
    };

    if !status.is_success() {
        let error = match decoder.decode::<E>(&body) {
            Ok(payload) => RequestError::ServerError {
                status: status.code,
                payload,
            },
            Err(cause) => RequestError::DecodeError {
                cause,
                raw: body.clone(),
            },
        };
        return Classification::Rejected {
            error,
            body: Some(body),
        };
    }

    Classification::Accepted { status, body }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::error::TransportError;

    #[derive(Debug, Deserialize)]
    struct OAuthError {
        error: String,
    }

    fn run(outcome: TransportOutcome) -> Classification<OAuthError> {
        classify(outcome, Decoder::shared())
    }

    #[test]
    fn transport_error_wins_over_everything() {
        let outcome = TransportOutcome {
            body: Some(b"{}".to_vec()),
            status: Some(StatusInfo::new(200)),
            error: Some(TransportError::Timeout),
        };
        match run(outcome) {
            Classification::Rejected {
                error: RequestError::ConnectionError(TransportError::Timeout),
                body,
            } => assert_eq!(body.as_deref(), Some(&b"{}"[..])),
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[test]
    fn missing_body_is_empty_response() {
        let outcome = TransportOutcome {
            body: None,
            status: Some(StatusInfo::new(200)),
            error: None,
        };
        assert!(matches!(
            run(outcome),
            Classification::Rejected {
                error: RequestError::EmptyServerResponse,
                ..
            }
        ));
    }

    #[test]
    fn missing_status_is_empty_response() {
        let outcome = TransportOutcome {
            body: Some(b"{}".to_vec()),
            status: None,
            error: None,
        };
        assert!(matches!(
            run(outcome),
            Classification::Rejected {
                error: RequestError::EmptyServerResponse,
                ..
            }
        ));
    }

    #[test]
    fn error_status_with_structured_body_is_server_error() {
        let outcome = TransportOutcome::response(400, r#"{"error":"invalid_grant"}"#);
        match run(outcome) {
            Classification::Rejected {
                error: RequestError::ServerError { status, payload },
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(payload.error, "invalid_grant");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn error_status_with_unexpected_body_is_decode_error() {
        let outcome = TransportOutcome::response(502, "<html>bad gateway</html>");
        match run(outcome) {
            Classification::Rejected {
                error: RequestError::DecodeError { raw, .. },
                ..
            } => assert_eq!(raw, b"<html>bad gateway</html>"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn status_boundaries() {
        for code in [199, 300] {
            let outcome = TransportOutcome::response(code, r#"{"error":"x"}"#);
            assert!(
                matches!(run(outcome), Classification::Rejected { .. }),
                "{code} should take the error path"
            );
        }
        for code in [200, 299] {
            let outcome = TransportOutcome::response(code, r#"{"anything":1}"#);
            assert!(
                matches!(run(outcome), Classification::Accepted { .. }),
                "{code} should take the success path"
            );
        }
    }

    #[test]
    fn success_is_left_undecoded() {
        let outcome = TransportOutcome::response(200, "not json at all");
        match run(outcome) {
            Classification::Accepted { status, body } => {
                assert_eq!(status.code, 200);
                assert_eq!(body, b"not json at all");
            }
            other => panic!("expected accepted, got {other:?}"),
        }
    }
}
