// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ambient enrichment of audit records.
//!
//! Callers state what happened; the enricher fills in who did it and from
//! where, using the injected [`RequestContext`]. Explicitly-set fields are
//! never overwritten; enrichment only closes gaps.

use serde_json::{Map, Value};

use cadence_server_auth::{RequestContext, UserType};

use crate::record::AuditRecordBuilder;
use crate::redaction::sanitize_input;

/// HTTP methods whose request bodies are worth capturing.
const MUTATING_METHODS: &[&str] = &["POST", "PUT", "PATCH", "DELETE"];

/// Fills unset attribution and request fields from ambient context.
///
/// Actor resolution order: explicit actor on the builder, then the
/// authenticated principal, then a magic-link id carried by the request
/// (attributed as `user_type = magic_link`), then anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditEnricher;

impl AuditEnricher {
	pub fn new() -> Self {
		Self
	}

	/// Apply enrichment to `builder`, consuming and returning it.
	pub fn enrich(
		&self,
		mut builder: AuditRecordBuilder,
		ctx: &dyn RequestContext,
	) -> AuditRecordBuilder {
		if !builder.has_actor() {
			builder = self.enrich_actor(builder, ctx);
		}

		if builder.ip_address.is_none() {
			builder.ip_address = ctx.client_ip();
		}
		if builder.user_agent.is_none() {
			builder.user_agent = ctx.user_agent();
		}
		if builder.session_id.is_none() {
			builder.session_id = ctx.session_id();
		}

		if !builder.has_request_data() {
			builder.request_data = self.capture_request(ctx);
		}

		builder
	}

	fn enrich_actor(
		&self,
		mut builder: AuditRecordBuilder,
		ctx: &dyn RequestContext,
	) -> AuditRecordBuilder {
		if let Some(principal) = ctx.principal() {
			if !principal.is_anonymous() {
				builder.user_type = principal.user_type();
				builder.user_id = principal.actor_id().map(str::to_string);
				return builder;
			}
		}

		if let Some(link_id) = ctx.magic_link_id() {
			builder.user_type = UserType::MagicLink;
			builder.user_id = Some(link_id.to_string());
		}

		builder
	}

	fn capture_request(&self, ctx: &dyn RequestContext) -> Option<Map<String, Value>> {
		let url = ctx.request_url();
		let method = ctx.request_method();
		if url.is_none() && method.is_none() {
			return None;
		}

		let mut data = Map::new();
		if let Some(url) = url {
			data.insert("url".to_string(), Value::String(url));
		}

		let is_mutating = method
			.as_deref()
			.map(|m| MUTATING_METHODS.contains(&m))
			.unwrap_or(false);
		if let Some(method) = method {
			data.insert("method".to_string(), Value::String(method));
		}

		// Bodies are only captured for mutating requests, scrubbed and capped.
		if is_mutating {
			if let Some(input) = ctx.raw_input() {
				data.insert(
					"input".to_string(),
					Value::Object(sanitize_input(&input)),
				);
			}
		}

		Some(data)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::record::ActionKind;
	use crate::redaction::REDACTED_PLACEHOLDER;
	use cadence_server_auth::{
		MagicLinkId, Principal, Role, StaticRequestContext, UserId,
	};
	use serde_json::json;

	fn input_map() -> Map<String, Value> {
		let mut input = Map::new();
		input.insert("title".to_string(), json!("Spring push"));
		input.insert("password".to_string(), json!("hunter2"));
		input
	}

	mod actor_resolution {
		use super::*;

		#[test]
		fn principal_wins_over_magic_link_header() {
			let user = UserId::generate();
			let ctx = StaticRequestContext::anonymous()
				.with_principal(Principal::user(user, Role::Admin))
				.with_magic_link_id(MagicLinkId::generate());

			let record = AuditEnricher::new()
				.enrich(AuditRecordBuilder::new(ActionKind::Updated), &ctx)
				.build();
			assert_eq!(record.user_type, UserType::Admin);
			assert_eq!(record.user_id, Some(user.to_string()));
		}

		#[test]
		fn magic_link_header_attributes_link_bearer() {
			let link_id = MagicLinkId::generate();
			let ctx = StaticRequestContext::anonymous().with_magic_link_id(link_id);

			let record = AuditEnricher::new()
				.enrich(AuditRecordBuilder::new(ActionKind::Updated), &ctx)
				.build();
			assert_eq!(record.user_type, UserType::MagicLink);
			assert_eq!(record.user_id, Some(link_id.to_string()));
		}

		#[test]
		fn anonymous_context_stays_anonymous() {
			let record = AuditEnricher::new()
				.enrich(
					AuditRecordBuilder::new(ActionKind::Login),
					&StaticRequestContext::anonymous(),
				)
				.build();
			assert_eq!(record.user_type, UserType::Anonymous);
			assert_eq!(record.user_id, None);
		}

		#[test]
		fn explicit_actor_is_never_overwritten() {
			let ctx = StaticRequestContext::anonymous()
				.with_principal(Principal::user(UserId::generate(), Role::Admin));

			let record = AuditEnricher::new()
				.enrich(
					AuditRecordBuilder::new(ActionKind::Updated)
						.actor("system", UserType::Agency),
					&ctx,
				)
				.build();
			assert_eq!(record.user_id, Some("system".to_string()));
			assert_eq!(record.user_type, UserType::Agency);
		}
	}

	mod request_capture {
		use super::*;

		#[test]
		fn captures_url_method_ip_agent_session() {
			let ctx = StaticRequestContext::anonymous()
				.with_request("GET", "/workspaces/1/content")
				.with_client_ip("192.0.2.4")
				.with_user_agent("curl/8.0")
				.with_session_id("sess-9");

			let record = AuditEnricher::new()
				.enrich(AuditRecordBuilder::new(ActionKind::Login), &ctx)
				.build();
			let data = record.request_data.unwrap();
			assert_eq!(data["url"], json!("/workspaces/1/content"));
			assert_eq!(data["method"], json!("GET"));
			assert_eq!(record.ip_address, Some("192.0.2.4".to_string()));
			assert_eq!(record.user_agent, Some("curl/8.0".to_string()));
			assert_eq!(record.session_id, Some("sess-9".to_string()));
		}

		#[test]
		fn mutating_request_captures_redacted_input() {
			let ctx = StaticRequestContext::anonymous()
				.with_request("POST", "/login")
				.with_raw_input(input_map());

			let record = AuditEnricher::new()
				.enrich(AuditRecordBuilder::new(ActionKind::Login), &ctx)
				.build();
			let data = record.request_data.unwrap();
			assert_eq!(data["input"]["title"], json!("Spring push"));
			assert_eq!(data["input"]["password"], json!(REDACTED_PLACEHOLDER));
		}

		#[test]
		fn read_request_body_is_not_captured() {
			let ctx = StaticRequestContext::anonymous()
				.with_request("GET", "/search")
				.with_raw_input(input_map());

			let record = AuditEnricher::new()
				.enrich(AuditRecordBuilder::new(ActionKind::Login), &ctx)
				.build();
			let data = record.request_data.unwrap();
			assert!(!data.contains_key("input"));
		}

		#[test]
		fn contextless_invocation_leaves_request_data_empty() {
			let record = AuditEnricher::new()
				.enrich(
					AuditRecordBuilder::new(ActionKind::Login),
					&StaticRequestContext::anonymous(),
				)
				.build();
			assert!(record.request_data.is_none());
		}
	}
}
