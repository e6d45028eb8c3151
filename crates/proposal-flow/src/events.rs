//! Wire contract shared by the account and risk-analysis services.
//!
//! Both directions use JSON envelopes keyed by an `event_type` token. The tokens below are
//! the only place the vocabulary is spelled out; producers and consumers on either side
//! build and match envelopes through [`EventType`] rather than string literals.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event vocabulary exchanged over the queues.
///
/// Unknown tokens survive decoding as [`EventType::Unrecognized`] so a consumer can log and
/// skip them instead of treating the whole envelope as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    ProposalCreated,
    DocumentsApproved,
    DocumentsRejected,
    CreditApproved,
    CreditRejected,
    FraudApproved,
    FraudRejected,
    RiskAnalysisCompleted,
    Unrecognized(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::ProposalCreated => "ProposalCreated",
            EventType::DocumentsApproved => "DocumentsApproved",
            EventType::DocumentsRejected => "DocumentsRejected",
            EventType::CreditApproved => "CreditApproved",
            EventType::CreditRejected => "CreditRejected",
            EventType::FraudApproved => "FraudApproved",
            EventType::FraudRejected => "FraudRejected",
            EventType::RiskAnalysisCompleted => "RiskAnalysisCompleted",
            EventType::Unrecognized(token) => token,
        }
    }

    /// True for the rejection stages that end a pipeline early.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EventType::DocumentsRejected | EventType::CreditRejected | EventType::FraudRejected
        )
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ProposalCreated" => EventType::ProposalCreated,
            "DocumentsApproved" => EventType::DocumentsApproved,
            "DocumentsRejected" => EventType::DocumentsRejected,
            "CreditApproved" => EventType::CreditApproved,
            "CreditRejected" => EventType::CreditRejected,
            "FraudApproved" => EventType::FraudApproved,
            "FraudRejected" => EventType::FraudRejected,
            "RiskAnalysisCompleted" => EventType::RiskAnalysisCompleted,
            _ => EventType::Unrecognized(value),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Unrecognized(token) => token,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applicant attributes captured when the proposal was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalPayload {
    pub full_name: String,
    pub cpf: String,
    pub salary: f64,
}

/// Outbound envelope from account to risk analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalCreatedEvent {
    pub event_type: EventType,
    pub proposal_id: Uuid,
    #[serde(default)]
    pub payload: Option<ProposalPayload>,
}

impl ProposalCreatedEvent {
    pub fn new(proposal_id: Uuid, payload: ProposalPayload) -> Self {
        Self {
            event_type: EventType::ProposalCreated,
            proposal_id,
            payload: Some(payload),
        }
    }

    /// Checks the fields evaluation depends on, reporting the first problem found.
    pub fn validate(&self) -> Result<&ProposalPayload, ValidationError> {
        if self.event_type.as_str().is_empty() {
            return Err(ValidationError::EmptyEventType);
        }
        if self.proposal_id.is_nil() {
            return Err(ValidationError::NilProposalId);
        }
        let payload = self.payload.as_ref().ok_or(ValidationError::MissingPayload)?;
        if payload.full_name.is_empty() {
            return Err(ValidationError::EmptyFullName);
        }
        if payload.cpf.is_empty() {
            return Err(ValidationError::EmptyCpf);
        }
        if payload.salary < 0.0 {
            return Err(ValidationError::NegativeSalary);
        }
        Ok(payload)
    }
}

/// Inbound envelope from risk analysis back to account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub event_type: EventType,
    pub proposal_id: Uuid,
    #[serde(default)]
    pub approved: bool,
}

impl StageEvent {
    pub fn new(event_type: EventType, proposal_id: Uuid, approved: bool) -> Self {
        Self {
            event_type,
            proposal_id,
            approved,
        }
    }
}

/// Input problems that stop an evaluation before anything is published.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("event_type is required")]
    EmptyEventType,
    #[error("proposal_id cannot be nil")]
    NilProposalId,
    #[error("payload cannot be nil")]
    MissingPayload,
    #[error("full_name is required")]
    EmptyFullName,
    #[error("cpf is required")]
    EmptyCpf,
    #[error("salary cannot be negative")]
    NegativeSalary,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode envelope: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode<E: Serialize>(event: &E) -> Result<String, CodecError> {
    serde_json::to_string(event).map_err(CodecError::Encode)
}

pub fn decode<E: DeserializeOwned>(body: &str) -> Result<E, CodecError> {
    serde_json::from_str(body).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn payload() -> ProposalPayload {
        ProposalPayload {
            full_name: "John Doe".to_string(),
            cpf: "12345678902".to_string(),
            salary: 5000.0,
        }
    }

    #[test]
    fn proposal_created_matches_wire_shape() {
        let id = Uuid::new_v4();
        let body = encode(&ProposalCreatedEvent::new(id, payload())).expect("encodes");
        let value: Value = serde_json::from_str(&body).expect("valid json");

        assert_eq!(
            value,
            json!({
                "event_type": "ProposalCreated",
                "proposal_id": id.to_string(),
                "payload": {"full_name": "John Doe", "cpf": "12345678902", "salary": 5000.0},
            })
        );
    }

    #[test]
    fn stage_event_decodes_from_peer_body() {
        let id = Uuid::new_v4();
        let body = format!(
            r#"{{"event_type":"RiskAnalysisCompleted","proposal_id":"{id}","approved":true}}"#
        );

        let event: StageEvent = decode(&body).expect("decodes");

        assert_eq!(event.event_type, EventType::RiskAnalysisCompleted);
        assert_eq!(event.proposal_id, id);
        assert!(event.approved);
    }

    #[test]
    fn unknown_tokens_are_preserved() {
        let id = Uuid::new_v4();
        let body =
            format!(r#"{{"event_type":"LimitRaised","proposal_id":"{id}","approved":false}}"#);

        let event: StageEvent = decode(&body).expect("decodes");

        assert_eq!(
            event.event_type,
            EventType::Unrecognized("LimitRaised".to_string())
        );
        assert_eq!(
            encode(&event).expect("encodes"),
            format!(r#"{{"event_type":"LimitRaised","proposal_id":"{id}","approved":false}}"#)
        );
    }

    #[test]
    fn malformed_bodies_fail_to_decode() {
        assert!(matches!(
            decode::<StageEvent>("not json"),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            decode::<StageEvent>(r#"{"event_type":"DocumentsApproved","proposal_id":"nope"}"#),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn validation_reports_first_problem() {
        let mut event = ProposalCreatedEvent::new(Uuid::new_v4(), payload());
        assert!(event.validate().is_ok());

        event.payload.as_mut().expect("payload").salary = 0.0;
        assert!(event.validate().is_ok(), "zero salary is valid input");

        event.payload.as_mut().expect("payload").salary = -100.0;
        assert_eq!(event.validate(), Err(ValidationError::NegativeSalary));

        event.payload.as_mut().expect("payload").cpf.clear();
        assert_eq!(event.validate(), Err(ValidationError::EmptyCpf));

        event.payload.as_mut().expect("payload").full_name.clear();
        assert_eq!(event.validate(), Err(ValidationError::EmptyFullName));

        event.payload = None;
        assert_eq!(event.validate(), Err(ValidationError::MissingPayload));

        event.proposal_id = Uuid::nil();
        assert_eq!(event.validate(), Err(ValidationError::NilProposalId));

        event.event_type = EventType::Unrecognized(String::new());
        assert_eq!(event.validate(), Err(ValidationError::EmptyEventType));
    }
}
