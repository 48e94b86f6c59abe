//! Where a classified outcome ends up.
//!
//! Each request picks one sink when it is created:
//! - `DefaultCompletion` decodes 2xx bodies into `T` and hands the caller an
//!   [`ApiResult`].
//! - `CustomHandler` replaces all of that. It receives the raw bytes and the
//!   shared decoder for 2xx responses, and every failure as well; the default
//!   completion is never involved.
//!
//! Either way the sink is consumed on delivery, so it runs at most once.

use serde::de::DeserializeOwned;

use crate::classifier::{ApiResult, Classification, Payload};
use crate::decoder::Decoder;
use crate::error::RequestError;
use crate::request::ApiRequest;

pub(crate) trait OutcomeSink<T, E>: Send {
    fn deliver(
        self: Box<Self>,
        request: &ApiRequest<T, E>,
        classification: Classification<E>,
        decoder: &Decoder,
    );
}

pub(crate) struct DefaultCompletion<F>(pub(crate) F);

impl<T, E, F> OutcomeSink<T, E> for DefaultCompletion<F>
where
    T: DeserializeOwned,
    F: FnOnce(&ApiRequest<T, E>, ApiResult<T, E>) + Send,
{
    fn deliver(
        self: Box<Self>,
        request: &ApiRequest<T, E>,
        classification: Classification<E>,
        decoder: &Decoder,
    ) {
        let result = match classification {
            Classification::Accepted { status, body } => match decoder.decode::<T>(&body) {
                Ok(value) => Ok(Payload { value, raw: body }),
                Err(cause) => {
                    tracing::warn!(
                        id = %request.id(),
                        status = status.code,
                        "success body did not match {}: {cause}",
                        std::any::type_name::<T>()
                    );
                    Err(RequestError::DecodeError { cause, raw: body })
                }
            },
            Classification::Rejected { error, .. } => Err(error),
        };
        (self.0)(request, result)
    }
}

pub(crate) struct CustomHandler<F>(pub(crate) F);

impl<T, E, F> OutcomeSink<T, E> for CustomHandler<F>
where
    F: FnOnce(&ApiRequest<T, E>, Option<&[u8]>, &Decoder, Option<RequestError<E>>) + Send,
{
    fn deliver(
        self: Box<Self>,
        request: &ApiRequest<T, E>,
        classification: Classification<E>,
        decoder: &Decoder,
    ) {
        match classification {
            Classification::Accepted { status, body } => {
                tracing::debug!(id = %request.id(), status = status.code, "handing success body to custom handler");
                (self.0)(request, Some(&body), decoder, None)
            }
            Classification::Rejected { error, body } => {
                (self.0)(request, body.as_deref(), decoder, Some(error))
            }
        }
    }
}
