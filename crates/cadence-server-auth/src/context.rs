// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Explicit request context.
//!
//! Rather than pulling "the current request" out of thread-local or global
//! state, every audit write and magic-link validation receives a
//! `&dyn RequestContext`. The HTTP layer implements this trait over its own
//! request type; tests and batch jobs use [`StaticRequestContext`].

use serde_json::{Map, Value};

use crate::principal::Principal;
use crate::types::MagicLinkId;

/// Ambient facts about the request that triggered an action.
///
/// Every accessor is optional: a cron-triggered cleanup has no URL, an
/// unauthenticated request has no principal. Implementations must not block;
/// these are read from already-parsed request state.
pub trait RequestContext: Send + Sync {
	/// The authenticated principal, if a session was presented.
	fn principal(&self) -> Option<Principal>;

	/// The magic-link id carried by the request (header or query), if any.
	///
	/// This is the *claimed* link id used for audit attribution of requests
	/// that arrived on a magic-link URL; it is not an authentication check.
	fn magic_link_id(&self) -> Option<MagicLinkId>;

	fn client_ip(&self) -> Option<String>;

	fn user_agent(&self) -> Option<String>;

	fn request_url(&self) -> Option<String>;

	/// HTTP method in upper case ("GET", "POST", ...).
	fn request_method(&self) -> Option<String>;

	fn session_id(&self) -> Option<String>;

	/// The parsed request body. Secrets are *not* assumed to be stripped
	/// upstream; the audit enricher redacts before persisting.
	fn raw_input(&self) -> Option<Map<String, Value>>;
}

/// A fixed, pre-populated [`RequestContext`].
///
/// The default value is a fully anonymous, body-less context, what a
/// scheduler-invoked job sees.
#[derive(Debug, Clone, Default)]
pub struct StaticRequestContext {
	pub principal: Option<Principal>,
	pub magic_link_id: Option<MagicLinkId>,
	pub client_ip: Option<String>,
	pub user_agent: Option<String>,
	pub request_url: Option<String>,
	pub request_method: Option<String>,
	pub session_id: Option<String>,
	pub raw_input: Option<Map<String, Value>>,
}

impl StaticRequestContext {
	/// An empty, anonymous context.
	pub fn anonymous() -> Self {
		Self::default()
	}

	pub fn with_principal(mut self, principal: Principal) -> Self {
		self.principal = Some(principal);
		self
	}

	pub fn with_magic_link_id(mut self, id: MagicLinkId) -> Self {
		self.magic_link_id = Some(id);
		self
	}

	pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
		self.client_ip = Some(ip.into());
		self
	}

	pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub fn with_request(mut self, method: impl Into<String>, url: impl Into<String>) -> Self {
		self.request_method = Some(method.into());
		self.request_url = Some(url.into());
		self
	}

	pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
		self.session_id = Some(session_id.into());
		self
	}

	pub fn with_raw_input(mut self, input: Map<String, Value>) -> Self {
		self.raw_input = Some(input);
		self
	}
}

impl RequestContext for StaticRequestContext {
	fn principal(&self) -> Option<Principal> {
		self.principal.clone()
	}

	fn magic_link_id(&self) -> Option<MagicLinkId> {
		self.magic_link_id
	}

	fn client_ip(&self) -> Option<String> {
		self.client_ip.clone()
	}

	fn user_agent(&self) -> Option<String> {
		self.user_agent.clone()
	}

	fn request_url(&self) -> Option<String> {
		self.request_url.clone()
	}

	fn request_method(&self) -> Option<String> {
		self.request_method.clone()
	}

	fn session_id(&self) -> Option<String> {
		self.session_id.clone()
	}

	fn raw_input(&self) -> Option<Map<String, Value>> {
		self.raw_input.clone()
	}
}
