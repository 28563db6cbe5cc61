//! Core types shared by every Courier crate.
//!
//! Two families live here:
//!
//! - **Domain types** ([`UserId`], [`GroupId`], [`EmailAddress`],
//!   [`Identity`], [`Group`]): the records the session and dispatch
//!   layers pass around.
//! - **Wire types** ([`Envelope`], [`Request`], [`Response`], [`Outcome`],
//!   [`Payload`]): what a caller sends in and what it gets back. These
//!   are serialized by a [`Codec`](crate::Codec).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The stable identifier of a registered identity.
///
/// Derived from the email address (see `courier_session::derive_user_id`),
/// so the same email always maps to the same id. The id is short, which
/// means two different emails *can* collide. That is an accepted risk:
/// treat the id as a lookup key, not as a proof of uniqueness.
///
/// `#[serde(transparent)]` serializes this as the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique identifier for a recipient group: `g-` followed by 32 hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// EmailAddress
// ---------------------------------------------------------------------------

/// Structural shape of an address: `local@domain.tld`, with a TLD of at
/// least two letters. This is a syntax check only; it says nothing about
/// whether the mailbox exists.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Returns `true` if `candidate` has the syntactic shape of an email address.
///
/// Leading and trailing whitespace is NOT stripped here; callers that read
/// addresses from user input should trim first.
pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

/// An email address that passed [`is_valid_email`].
///
/// Constructing one through [`EmailAddress::parse`] is the only way to get
/// a validated value from user input. Deserialization is transparent and
/// does not re-validate: values read back from storage were validated when
/// they were first written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Trims and validates `raw`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidEmail`] if the trimmed value is not
    /// shaped like an address.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let trimmed = raw.trim();
        if is_valid_email(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ProtocolError::InvalidEmail(trimmed.to_string()))
        }
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A durable identity record.
///
/// `password_hash` is an Argon2 PHC string. It is never serialized, so an
/// `Identity` can't leak the hash through a response by accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: EmailAddress,
    #[serde(skip)]
    pub password_hash: String,
}

/// The public view of an [`Identity`], as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityView {
    pub id: UserId,
    pub email: EmailAddress,
}

impl From<&Identity> for IdentityView {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
        }
    }
}

/// A named recipient list with the message that goes out to it.
///
/// `owner` is the only field the ownership gate reads. `recipients` is kept
/// exactly as supplied; the dispatcher filters it at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub owner: UserId,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A request plus the session credential the caller holds, if any.
///
/// The credential travels next to the request rather than inside it, the
/// way a cookie travels next to an HTTP body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    pub request: Request,
}

/// Everything a caller can ask Courier to do.
///
/// Internally tagged: `{"type": "login", "email": "...", "password": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Start a registration. A confirmation token is mailed to `email`.
    Register { email: String, password: String },
    /// Confirm a registration with the mailed token.
    VerifyRegistration { token: String },
    /// Check the password and mail a 6-digit login code.
    Login { email: String, password: String },
    /// Trade the login code for a session credential.
    VerifyLoginCode { email: String, code: String },
    /// Tell the caller to discard its credential.
    Logout,
    /// Return the identity behind the presented credential.
    CurrentIdentity,
    CreateGroup(NewGroup),
    ListGroups,
    EditGroup(GroupPatch),
    DeleteGroup { group_id: GroupId },
    /// Send the group's message to all of its recipients.
    ExecuteGroup { group_id: GroupId },
}

/// Input for creating a group.
///
/// Recipients come from `recipients` plus at most one CSV source. The body
/// comes from exactly one of `message`, `html_path`, `html_link`. Those
/// rules are enforced when the request is turned into a draft, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_path: Option<String>,
}

/// A partial update to a group. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPatch {
    pub group_id: GroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GroupPatch {
    /// A patch for `group_id` that changes nothing yet.
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            name: None,
            recipients: None,
            subject: None,
            message: None,
        }
    }

    /// Applies the set fields to `group`.
    pub fn apply(self, group: &mut Group) {
        if let Some(name) = self.name {
            group.name = name;
        }
        if let Some(recipients) = self.recipients {
            group.recipients = recipients;
        }
        if let Some(subject) = self.subject {
            group.subject = subject;
        }
        if let Some(message) = self.message {
            group.body = message;
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// The logical result of a request.
///
/// Each variant names one caller-visible outcome. Authentication failures
/// are deliberately coarse: `InvalidCredentials` covers both "unknown
/// email" and "wrong password".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Outcome {
    Accepted,
    Conflict,
    Verified,
    InvalidOrExpiredToken,
    InvalidCredentials,
    ChallengeSent,
    InvalidOrExpiredCode,
    SessionIssued,
    SignedOut,
    CurrentIdentity,
    GroupCreated,
    Groups,
    GroupUpdated,
    GroupDeleted,
    Unauthorized,
    NotFound,
    NoValidRecipients,
    DispatchPartialOrFullFailure,
    DispatchSuccess,
    InvalidInput,
    Internal,
}

impl Outcome {
    /// The HTTP-style status code conventionally paired with this outcome.
    pub fn status(self) -> u16 {
        match self {
            Self::Accepted | Self::GroupCreated => 201,
            Self::Verified
            | Self::ChallengeSent
            | Self::SessionIssued
            | Self::SignedOut
            | Self::CurrentIdentity
            | Self::Groups
            | Self::GroupUpdated
            | Self::GroupDeleted
            | Self::DispatchSuccess => 200,
            Self::Conflict => 409,
            Self::InvalidOrExpiredToken
            | Self::NoValidRecipients
            | Self::InvalidInput => 400,
            Self::InvalidCredentials
            | Self::InvalidOrExpiredCode
            | Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::DispatchPartialOrFullFailure | Self::Internal => 500,
        }
    }

    /// Returns `true` for outcomes that report success.
    pub fn is_success(self) -> bool {
        self.status() < 400
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One recipient that did not receive a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientFailure {
    pub address: String,
    pub error: String,
}

/// Per-recipient summary of a dispatch, sent back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// How many recipients the message was handed off to successfully.
    pub delivered: usize,
    /// Every recipient whose send failed, with the reason.
    pub failures: Vec<RecipientFailure>,
}

/// Data attached to a response, if the outcome carries any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    #[default]
    None,
    /// A freshly issued session credential.
    Session { credential: String },
    Identity(IdentityView),
    Group(Group),
    Groups(Vec<Group>),
    Dispatch(DispatchSummary),
}

impl Payload {
    /// Returns `true` for [`Payload::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// What the caller gets back for every [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub outcome: Outcome,
    pub message: String,
    #[serde(default, skip_serializing_if = "Payload::is_none")]
    pub payload: Payload,
}

impl Response {
    /// A response with the outcome's conventional status and no payload.
    pub fn new(outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            status: outcome.status(),
            outcome,
            message: message.into(),
            payload: Payload::None,
        }
    }

    /// Attaches a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

// =========================================================================
// Tests
// =========================================================================
