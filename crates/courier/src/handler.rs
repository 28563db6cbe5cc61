//! Request routing: one [`Envelope`] in, one [`Response`] out.
//!
//! The handler knows nothing about the wire it is served over. A caller
//! (an HTTP adapter, a queue consumer, a test) hands it an envelope or raw
//! JSON bytes and sends back whatever comes out. The flow is:
//!   1. Decode the envelope (byte entry point only)
//!   2. Route the request to the auth flow, the gate, or the group service
//!   3. Map the result, success or error, to a [`Response`]

use std::sync::Arc;

use courier_dispatch::DispatchError;
use courier_protocol::{
    Codec, Envelope, IdentityView, JsonCodec, Outcome, Payload, Request, Response,
};
use courier_session::{AuthFlow, IdentityStore, OwnershipGate};
use courier_transport::Mailer;

use crate::{ContentResolver, CourierError, GroupService, GroupStore};

/// Fallback body if a response can't be encoded.
const ENCODE_FAILURE_BODY: &[u8] =
    br#"{"status":500,"outcome":"Internal","message":"internal server error"}"#;

/// Routes requests to the right component and builds responses.
pub struct RequestHandler<S, G, C, M> {
    auth: Arc<AuthFlow<S, M>>,
    gate: Arc<OwnershipGate<S>>,
    groups: Arc<GroupService<S, G, C, M>>,
    codec: JsonCodec,
}

impl<S, G, C, M> RequestHandler<S, G, C, M>
where
    S: IdentityStore,
    G: GroupStore,
    C: ContentResolver,
    M: Mailer,
{
    pub fn new(
        auth: Arc<AuthFlow<S, M>>,
        gate: Arc<OwnershipGate<S>>,
        groups: Arc<GroupService<S, G, C, M>>,
    ) -> Self {
        Self {
            auth,
            gate,
            groups,
            codec: JsonCodec,
        }
    }

    /// Decodes a JSON envelope, handles it, and encodes the response.
    ///
    /// Undecodable input yields an `InvalidInput` response rather than an
    /// error, so the caller always has bytes to send back.
    pub async fn handle_bytes(&self, data: &[u8]) -> Vec<u8> {
        let response = match self.codec.decode::<Envelope>(data) {
            Ok(envelope) => self.handle(envelope).await,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting undecodable request");
                error_response(CourierError::from(e))
            }
        };

        match self.codec.encode(&response) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                ENCODE_FAILURE_BODY.to_vec()
            }
        }
    }

    /// Handles one request. Never fails: errors become error responses.
    pub async fn handle(&self, envelope: Envelope) -> Response {
        let credential = envelope.credential.as_deref();
        match self.route(credential, envelope.request).await {
            Ok(response) => response,
            Err(e) => error_response(e),
        }
    }

    async fn route(
        &self,
        credential: Option<&str>,
        request: Request,
    ) -> Result<Response, CourierError> {
        let response = match request {
            Request::Register { email, password } => {
                self.auth.register(&email, &password).await?;
                Response::new(
                    Outcome::Accepted,
                    "verification token sent; check your email",
                )
            }
            Request::VerifyRegistration { token } => {
                let identity = self.auth.verify_registration(&token).await?;
                Response::new(Outcome::Verified, "registration verified")
                    .with_payload(Payload::Identity(IdentityView::from(&identity)))
            }
            Request::Login { email, password } => {
                self.auth.login(&email, &password).await?;
                Response::new(Outcome::ChallengeSent, "login code sent; check your email")
            }
            Request::VerifyLoginCode { email, code } => {
                let token = self.auth.verify_login_code(&email, &code).await?;
                Response::new(Outcome::SessionIssued, "signed in").with_payload(
                    Payload::Session {
                        credential: token.credential,
                    },
                )
            }
            Request::Logout => {
                self.auth.logout();
                Response::new(Outcome::SignedOut, "signed out; discard your credential")
            }
            Request::CurrentIdentity => {
                let identity = self.gate.resolve(credential).await?;
                Response::new(Outcome::CurrentIdentity, "current identity")
                    .with_payload(Payload::Identity(IdentityView::from(&identity)))
            }
            Request::CreateGroup(new) => {
                let group = self.groups.create(credential, new).await?;
                Response::new(Outcome::GroupCreated, "group created")
                    .with_payload(Payload::Group(group))
            }
            Request::ListGroups => {
                let groups = self.groups.list(credential).await?;
                Response::new(Outcome::Groups, format!("{} group(s)", groups.len()))
                    .with_payload(Payload::Groups(groups))
            }
            Request::EditGroup(patch) => {
                let group = self.groups.edit(credential, patch).await?;
                Response::new(Outcome::GroupUpdated, "group updated")
                    .with_payload(Payload::Group(group))
            }
            Request::DeleteGroup { group_id } => {
                self.groups.delete(credential, &group_id).await?;
                Response::new(Outcome::GroupDeleted, "group deleted")
            }
            Request::ExecuteGroup { group_id } => {
                let report = self.groups.execute(credential, &group_id).await?;
                Response::new(
                    Outcome::DispatchSuccess,
                    format!("sent to {} recipient(s)", report.delivered()),
                )
                .with_payload(Payload::Dispatch(report.summary()))
            }
        };
        Ok(response)
    }
}

/// Converts an error into the response the caller sees.
///
/// A failed dispatch keeps its per-recipient detail as the payload.
pub fn error_response(err: CourierError) -> Response {
    let outcome = err.outcome();
    if outcome == Outcome::Internal {
        tracing::error!(error = %err, "request failed");
    } else {
        tracing::debug!(%outcome, error = %err, "request rejected");
    }

    let response = Response::new(outcome, err.public_message());
    match err {
        CourierError::Dispatch(DispatchError::Failed(report)) => {
            response.with_payload(Payload::Dispatch(report.summary()))
        }
        _ => response,
    }
}
