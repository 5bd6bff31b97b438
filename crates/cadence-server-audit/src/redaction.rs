// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret redaction and payload truncation for captured request input.
//!
//! Request bodies land in the audit trail verbatim unless scrubbed here, so
//! this module is the only gate between user input and durable storage.
//! Truncation is infallible: a payload that cannot be measured or is too
//! large becomes the sentinel object, never an error.

use serde_json::{json, Map, Value};

/// Maximum serialized size of a captured request payload, in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024;

/// Placeholder stored in place of a redacted value.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Key substrings that mark a field as sensitive, matched case-insensitively.
const SENSITIVE_KEY_PARTS: &[&str] = &[
	"password",
	"passwd",
	"secret",
	"token",
	"api_key",
	"apikey",
	"pin",
	"authorization",
	"credential",
	"private_key",
];

fn is_sensitive_key(key: &str) -> bool {
	let lowered = key.to_ascii_lowercase();
	SENSITIVE_KEY_PARTS
		.iter()
		.any(|part| lowered.contains(part))
}

fn redact_value(value: &mut Value) {
	match value {
		Value::Object(map) => {
			for (key, nested) in map.iter_mut() {
				if is_sensitive_key(key) {
					*nested = Value::String(REDACTED_PLACEHOLDER.to_string());
				} else {
					redact_value(nested);
				}
			}
		}
		Value::Array(items) => {
			for item in items.iter_mut() {
				redact_value(item);
			}
		}
		_ => {}
	}
}

/// Replace every sensitive value in `input` with [`REDACTED_PLACEHOLDER`],
/// recursing through nested objects and arrays. Keys are kept so the shape
/// of the request stays legible.
pub fn redact_secrets(input: &Map<String, Value>) -> Map<String, Value> {
	let mut out = input.clone();
	for (key, value) in out.iter_mut() {
		if is_sensitive_key(key) {
			*value = Value::String(REDACTED_PLACEHOLDER.to_string());
		} else {
			redact_value(value);
		}
	}
	out
}

/// The sentinel stored when a payload exceeds [`MAX_PAYLOAD_BYTES`].
fn truncation_sentinel(original_size: usize) -> Map<String, Value> {
	let mut sentinel = Map::new();
	sentinel.insert("_truncated".to_string(), json!(true));
	sentinel.insert("_original_size".to_string(), json!(original_size));
	sentinel
}

/// Enforce the payload size cap.
///
/// Payloads at or under the cap pass through unchanged. Oversized payloads
/// are replaced wholesale by `{"_truncated": true, "_original_size": N}`
/// where `N` is the serialized byte length. This never fails; a payload that
/// cannot be serialized at all is treated as oversized with size 0.
pub fn truncate_payload(input: Map<String, Value>) -> Map<String, Value> {
	match serde_json::to_vec(&input) {
		Ok(bytes) if bytes.len() <= MAX_PAYLOAD_BYTES => input,
		Ok(bytes) => truncation_sentinel(bytes.len()),
		Err(_) => truncation_sentinel(0),
	}
}

/// Full scrub applied to captured request input: redact, then cap.
pub fn sanitize_input(input: &Map<String, Value>) -> Map<String, Value> {
	truncate_payload(redact_secrets(input))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn map(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			other => panic!("expected object, got {other}"),
		}
	}

	mod redaction {
		use super::*;

		#[test]
		fn redacts_top_level_secrets() {
			let input = map(json!({
				"email": "client@example.com",
				"password": "hunter2",
				"password_confirmation": "hunter2",
				"api_key": "sk-123",
			}));

			let out = redact_secrets(&input);
			assert_eq!(out["email"], json!("client@example.com"));
			assert_eq!(out["password"], json!(REDACTED_PLACEHOLDER));
			assert_eq!(out["password_confirmation"], json!(REDACTED_PLACEHOLDER));
			assert_eq!(out["api_key"], json!(REDACTED_PLACEHOLDER));
		}

		#[test]
		fn redacts_nested_and_array_secrets() {
			let input = map(json!({
				"profile": { "name": "Ana", "access_token": "tok" },
				"integrations": [
					{ "kind": "trello", "secret": "s3cret" },
					{ "kind": "slack", "channel": "#content" },
				],
			}));

			let out = redact_secrets(&input);
			assert_eq!(out["profile"]["name"], json!("Ana"));
			assert_eq!(out["profile"]["access_token"], json!(REDACTED_PLACEHOLDER));
			assert_eq!(
				out["integrations"][0]["secret"],
				json!(REDACTED_PLACEHOLDER)
			);
			assert_eq!(out["integrations"][1]["channel"], json!("#content"));
		}

		#[test]
		fn matching_is_case_insensitive() {
			let input = map(json!({ "Authorization": "Bearer abc", "ApiKey": "k" }));
			let out = redact_secrets(&input);
			assert_eq!(out["Authorization"], json!(REDACTED_PLACEHOLDER));
			assert_eq!(out["ApiKey"], json!(REDACTED_PLACEHOLDER));
		}

		#[test]
		fn leaves_clean_input_untouched() {
			let input = map(json!({ "title": "Q3 campaign", "status": "draft" }));
			assert_eq!(redact_secrets(&input), input);
		}
	}

	mod truncation {
		use super::*;

		#[test]
		fn small_payload_passes_through() {
			let input = map(json!({ "title": "short" }));
			assert_eq!(truncate_payload(input.clone()), input);
		}

		#[test]
		fn oversized_payload_becomes_sentinel() {
			let mut input = Map::new();
			input.insert("body".to_string(), json!("x".repeat(MAX_PAYLOAD_BYTES)));
			let original_size = serde_json::to_vec(&input).unwrap().len();
			assert!(original_size > MAX_PAYLOAD_BYTES);

			let out = truncate_payload(input);
			assert_eq!(out["_truncated"], json!(true));
			assert_eq!(out["_original_size"], json!(original_size));
			assert_eq!(out.len(), 2);
		}

		#[test]
		fn payload_exactly_at_cap_passes_through() {
			// Account for the JSON framing around the single key.
			let framing = serde_json::to_vec(&map(json!({ "body": "" }))).unwrap().len();
			let mut input = Map::new();
			input.insert(
				"body".to_string(),
				json!("x".repeat(MAX_PAYLOAD_BYTES - framing)),
			);
			assert_eq!(
				serde_json::to_vec(&input).unwrap().len(),
				MAX_PAYLOAD_BYTES
			);
			assert_eq!(truncate_payload(input.clone()), input);
		}
	}

	mod sanitize {
		use super::*;

		#[test]
		fn redacts_then_caps() {
			let input = map(json!({ "password": "p", "note": "fine" }));
			let out = sanitize_input(&input);
			assert_eq!(out["password"], json!(REDACTED_PLACEHOLDER));
			assert_eq!(out["note"], json!("fine"));
		}

		#[test]
		fn oversized_secret_payload_still_truncates() {
			let mut input = Map::new();
			input.insert("password".to_string(), json!("p"));
			input.insert("blob".to_string(), json!("y".repeat(MAX_PAYLOAD_BYTES * 2)));

			let out = sanitize_input(&input);
			assert_eq!(out["_truncated"], json!(true));
		}
	}
}
