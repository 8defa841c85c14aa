use bacip_core::apdu::BacnetError;
use bacip_core::types::{ErrorClass, ErrorCode};
use bacip_datalink::DataLinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] bacip_core::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bacip_core::DecodeError),
    #[error("request timed out")]
    Timeout,
    #[error("all invoke ids are in use")]
    PoolExhausted,
    #[error("no outstanding transaction for invoke id {0}")]
    UnknownTransaction(u8),
    #[error("remote service error for service choice {service_choice}")]
    RemoteServiceError {
        service_choice: u8,
        error_class_raw: Option<u32>,
        error_code_raw: Option<u32>,
        error_class: Option<ErrorClass>,
        error_code: Option<ErrorCode>,
    },
    #[error("request does not fit in a single frame")]
    SegmentedRequestTooLarge,
    #[error("unsupported response")]
    UnsupportedResponse,
}

impl From<BacnetError> for ClientError {
    fn from(err: BacnetError) -> Self {
        Self::RemoteServiceError {
            service_choice: err.service_choice,
            error_class_raw: err.error_class,
            error_code_raw: err.error_code,
            error_class: err.error_class.map(ErrorClass::from_u32),
            error_code: err.error_code.map(ErrorCode::from_u32),
        }
    }
}
