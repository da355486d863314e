/// Core error type for the bot.
///
/// Adapter crates map their library errors into this type so the poller can
/// report every failure the same way (one chat message per distinct error).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("response body is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("endpoint {endpoint} is unreachable: {reason}")]
    EndpointUnreachable { endpoint: String, reason: String },

    #[error("endpoint {endpoint} responded with unexpected status code {status}")]
    UnexpectedStatusCode { endpoint: String, status: u16 },

    #[error("endpoint {endpoint} rejected the request: {code}: {message}")]
    ServiceRejection {
        endpoint: String,
        code: String,
        message: String,
    },

    #[error("empty or invalid payload: expected a non-empty object, got {0}")]
    EmptyOrInvalidPayload(String),

    #[error("payload has no `homeworks` list")]
    MissingHomeworkList,

    #[error("homework record is not an object: {0}")]
    InvalidHomeworkRecord(String),

    #[error("homework record has no `status`")]
    MissingStatusField,

    #[error("homework record has no `homework_name`")]
    MissingNameField,

    #[error("unrecognized homework status: {0:?}")]
    UnrecognizedStatus(String),

    #[error("failed to deliver notification: {0}")]
    NotificationDeliveryFailure(String),
}

impl Error {
    /// API-side transport failures may clear up by the next cycle. Payload and
    /// status errors repeat until the provider's data changes, and a delivery
    /// failure is fatal for the cycle that hit it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::EndpointUnreachable { .. } | Error::UnexpectedStatusCode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
