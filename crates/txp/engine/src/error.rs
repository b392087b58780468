use std::borrow::Cow;

use multisig_txp_store::TxpStoreError;

use crate::service::{PaymentRequestError, WalletServiceError};

pub type Result<T, E = TxpEngineError> = core::result::Result<T, E>;

/// Errors surfaced by the proposal engine.
///
/// Every failure of a collaborator is mapped into exactly one of these kinds before it leaves the
/// engine, so callers only ever deal with this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxpEngineError {
    /// The spending password was wrong; the user should be prompted again.
    #[error("invalid password")]
    InvalidPassword,

    /// The user dismissed the password prompt.
    #[error("password canceled")]
    PasswordCanceled,

    /// Signing the proposal failed.
    #[error("signing error: {0}")]
    Signing(Cow<'static, str>),

    /// The wallet service refused a reject, remove or refresh request.
    #[error("service error: {0}")]
    Service(Cow<'static, str>),

    /// The signed transaction could not be broadcast.
    #[error("broadcast error: {0}")]
    Broadcast(Cow<'static, str>),

    /// A receive address could not be derived.
    #[error("address error: {0}")]
    Address(Cow<'static, str>),

    /// The merchant payment request could not be fetched.
    #[error("payment request error: {0}")]
    PaymentRequest(Cow<'static, str>),

    /// The referenced key, wallet or proposal is not in the store.
    #[error("not found error: {0}")]
    NotFound(Cow<'static, str>),

    /// The requested action is not available on the proposal in its current state.
    #[error("not actionable error: {0}")]
    NotActionable(Cow<'static, str>),

    /// Another operation on the same proposal has not finished yet.
    #[error("operation in flight error: {0}")]
    OperationInFlight(Cow<'static, str>),

    /// The proposal store rejected an update.
    #[error("store error: {0}")]
    Store(Cow<'static, str>),
}

impl TxpEngineError {
    /// Returns `true` for errors the user recovers from locally by re-entering or dismissing
    /// the password prompt.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(self, Self::InvalidPassword | Self::PasswordCanceled)
    }

    /// Returns the title of the notification presenting this error, `None` if nothing should be
    /// shown.
    pub fn user_title(&self) -> Option<&'static str> {
        match self {
            Self::PasswordCanceled => None,
            Self::InvalidPassword => Some("Wrong password"),
            Self::Broadcast(_) => Some("Error"),
            Self::PaymentRequest(_) => Some("Error fetching this invoice"),
            _ => Some("Uh oh, something went wrong"),
        }
    }

    /// Returns the text presented to the user, `None` if nothing should be shown.
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            Self::PasswordCanceled => return None,
            Self::InvalidPassword => "Wrong spending password".to_owned(),
            Self::Signing(msg)
            | Self::Service(msg)
            | Self::Address(msg)
            | Self::PaymentRequest(msg) => msg.to_string(),
            Self::Broadcast(msg) if msg.is_empty() => "Could not broadcast payment".to_owned(),
            Self::Broadcast(msg) => format!("Could not broadcast payment: {msg}"),
            Self::NotFound(_)
            | Self::NotActionable(_)
            | Self::OperationInFlight(_)
            | Self::Store(_) => format!("Something went wrong: {self}"),
        };

        Some(message)
    }

    pub(crate) fn not_found<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::NotFound(err.into())
    }

    pub(crate) fn not_actionable<E>(err: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self::NotActionable(err.into())
    }

    /// Maps a failure of the accept-and-sign call.
    pub(crate) fn signing(err: WalletServiceError) -> Self {
        match err {
            WalletServiceError::InvalidPassword => Self::InvalidPassword,
            WalletServiceError::PasswordCanceled => Self::PasswordCanceled,
            WalletServiceError::Provider(msg) => Self::Signing(msg),
        }
    }

    pub(crate) fn service(err: WalletServiceError) -> Self {
        Self::Service(err.into_message())
    }

    pub(crate) fn broadcast(err: WalletServiceError) -> Self {
        Self::Broadcast(err.into_message())
    }

    pub(crate) fn address(err: WalletServiceError) -> Self {
        Self::Address(err.into_message())
    }
}

impl From<TxpStoreError> for TxpEngineError {
    fn from(err: TxpStoreError) -> Self {
        Self::Store(err.to_string().into())
    }
}

impl From<PaymentRequestError> for TxpEngineError {
    fn from(err: PaymentRequestError) -> Self {
        match err {
            PaymentRequestError::Network(msg) => Self::PaymentRequest(msg),
            PaymentRequestError::InvalidUrl(msg) => Self::PaymentRequest(msg),
        }
    }
}
