//! Request Intake & Envelope Normalizer — framing-layer collaborator.
//!
//! Parses the raw request body, enforces the size guard, distinguishes single
//! vs. batch requests, and recognizes the empty-object network-probe
//! handshake — all before the dispatch core ever sees a request.

use serde_json::Value;

use crate::envelope::RequestEnvelope;

#[derive(Debug)]
pub enum ParsedBody {
    /// `POST {}` — client-library probe handshake.
    Probe,
    Single(RequestEnvelope),
    Batch(Vec<RequestEnvelope>),
}

#[derive(Debug)]
pub enum IntakeError {
    ParseError,
    TooLarge,
}

/// Parse and pre-validate a raw request body.
///
/// `max_size` enforces the body-size guard before JSON parsing is attempted
/// at all.
pub fn parse_body(bytes: &[u8], max_size: usize) -> Result<ParsedBody, IntakeError> {
    if bytes.len() > max_size {
        return Err(IntakeError::TooLarge);
    }
    if bytes.is_empty() {
        return Err(IntakeError::ParseError);
    }

    let value: Value = serde_json::from_slice(bytes).map_err(|_| IntakeError::ParseError)?;

    match value {
        Value::Object(ref map) if map.is_empty() => Ok(ParsedBody::Probe),
        Value::Object(_) => {
            let req: RequestEnvelope =
                serde_json::from_value(value).map_err(|_| IntakeError::ParseError)?;
            Ok(ParsedBody::Single(req))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let req: RequestEnvelope =
                    serde_json::from_value(item).map_err(|_| IntakeError::ParseError)?;
                out.push(req);
            }
            Ok(ParsedBody::Batch(out))
        }
        _ => Err(IntakeError::ParseError),
    }
}
