//! The request server.
//!
//! Answers requests for wrapped-key record names under the group prefix.
//! Each request moves through
//!
//! ```text
//! Received -> Parsed -> Resolved   -> Responded
//! Received -> (Parsed ->) Unresolved -> ErrorResponded
//! ```
//!
//! Every unresolved request gets the same [`Response::Negative`]; the reason
//! only shows up in the [`ServedRequest`] and the logs. The server holds no
//! keys and does no cryptography.

use std::sync::Arc;

use bytes::Bytes;

use groupkey_core::{naming, KeyEpoch, MemberId, Name};
use groupkey_transport::{RequestHandler, Response};

use crate::registry::MemberRegistry;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Parsed,
    Resolved,
    Unresolved(NegativeReason),
    Responded,
    ErrorResponded,
}

/// Why a request was answered negatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeReason {
    /// The name does not follow the naming scheme.
    MalformedName,
    /// The name belongs to another group.
    ForeignPrefix,
    /// No record for the member.
    UnknownMember,
    /// The stored record could not be encoded.
    Encoding,
}

/// The outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedRequest {
    /// What was sent back.
    pub response: Response,
    /// Final state, `Responded` or `ErrorResponded`.
    pub state: RequestState,
    /// Set when the response is negative.
    pub reason: Option<NegativeReason>,
    /// The member and epoch of the record served, if any.
    pub served: Option<(MemberId, KeyEpoch)>,
}

/// Serves wrapped-key records for one group.
#[derive(Clone)]
pub struct RequestServer {
    prefix: Arc<Name>,
    registry: Arc<MemberRegistry>,
}

impl RequestServer {
    /// A server for the group at `prefix`, reading from `registry`.
    pub fn new(prefix: Arc<Name>, registry: Arc<MemberRegistry>) -> Self {
        Self { prefix, registry }
    }

    /// The group prefix served.
    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Answer a request for `name`.
    pub fn serve(&self, name: &Name) -> ServedRequest {
        let mut state = RequestState::Received;
        tracing::trace!(name = %name, ?state, "request");

        let (prefix, member) = match naming::parse(name) {
            Ok(parsed) => parsed,
            Err(_) => return self.negative(name, NegativeReason::MalformedName),
        };
        state = RequestState::Parsed;
        tracing::trace!(name = %name, ?state, "request");

        // The probe runs before the prefix check so every parsed name costs
        // one lookup.
        let record = self.registry.lookup(&member);
        if prefix != *self.prefix {
            return self.negative(name, NegativeReason::ForeignPrefix);
        }
        let Some(record) = record else {
            return self.negative(name, NegativeReason::UnknownMember);
        };
        state = RequestState::Resolved;
        tracing::trace!(name = %name, ?state, "request");

        let payload = match record.to_bytes() {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                tracing::warn!(member = %member, "failed to encode record: {}", e);
                return self.negative(name, NegativeReason::Encoding);
            }
        };

        tracing::debug!(member = %member, epoch = %record.epoch, "served key record");
        ServedRequest {
            response: Response::Data(payload),
            state: RequestState::Responded,
            reason: None,
            served: Some((member, record.epoch)),
        }
    }

    fn negative(&self, name: &Name, reason: NegativeReason) -> ServedRequest {
        let state = RequestState::Unresolved(reason);
        tracing::debug!(name = %name, ?state, "negative response");
        ServedRequest {
            response: Response::Negative,
            state: RequestState::ErrorResponded,
            reason: Some(reason),
            served: None,
        }
    }
}

impl RequestHandler for RequestServer {
    fn handle(&self, name: &Name) -> Response {
        self.serve(name).response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupkey_core::{name_for, Keypair};
    use groupkey_wrap::{
        ContentAlgorithm, GroupContentKey, KeyWrapper, WrappedKeyRecord, X25519StaticSecret,
    };

    fn setup() -> (RequestServer, Name) {
        let prefix = Name::from_uri("/org/NAC/d").unwrap();
        let registry = Arc::new(MemberRegistry::new(KeyEpoch(1)));

        let alice = MemberId::from_uri("/alice").unwrap();
        let name = name_for(&prefix, &alice);
        let gck = GroupContentKey::generate(KeyEpoch(1), ContentAlgorithm::default());
        let blob = KeyWrapper::default()
            .wrap_for_key(&gck, &X25519StaticSecret::generate().public_key(), b"ctx")
            .unwrap();
        registry
            .put(WrappedKeyRecord::sign(name, alice, &blob, 0, &Keypair::generate()).unwrap())
            .unwrap();

        (RequestServer::new(Arc::new(prefix.clone()), registry), prefix)
    }

    #[test]
    fn test_hit_returns_record() {
        let (server, prefix) = setup();
        let alice = MemberId::from_uri("/alice").unwrap();

        let served = server.serve(&name_for(&prefix, &alice));
        assert_eq!(served.state, RequestState::Responded);
        assert_eq!(served.served, Some((alice, KeyEpoch(1))));

        let payload = served.response.payload().unwrap();
        let record = WrappedKeyRecord::from_bytes(payload).unwrap();
        assert_eq!(record.epoch, KeyEpoch(1));
    }

    #[test]
    fn test_negative_reasons() {
        let (server, prefix) = setup();
        let alice = MemberId::from_uri("/alice").unwrap();
        let bob = MemberId::from_uri("/bob").unwrap();

        let cases = [
            (Name::from_uri("/org/NAC/d/garbage").unwrap(), NegativeReason::MalformedName),
            (
                name_for(&Name::from_uri("/other/NAC/d").unwrap(), &alice),
                NegativeReason::ForeignPrefix,
            ),
            (name_for(&prefix, &bob), NegativeReason::UnknownMember),
        ];

        for (name, reason) in cases {
            let served = server.serve(&name);
            assert_eq!(served.state, RequestState::ErrorResponded);
            assert_eq!(served.reason, Some(reason));
            assert_eq!(served.response, Response::Negative);
            assert_eq!(server.handle(&name).to_bytes(), Response::Negative.to_bytes());
        }
    }
}
