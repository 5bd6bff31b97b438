// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The contract an entity implements to become auditable.

use serde_json::{Map, Value};

use cadence_server_auth::WorkspaceId;

use crate::record::AuditableRef;

/// Implemented by domain entities that want model-change auditing.
///
/// `audit_snapshot` returns the persisted-attribute view of the entity; the
/// writer diffs consecutive snapshots to produce `old_values`/`new_values`.
/// Implementations should exclude derived or secret fields from the snapshot
/// rather than relying on downstream redaction.
pub trait AuditEntity {
	/// Stable type name stored in the audit trail ("content_item", ...).
	fn type_name(&self) -> &'static str;

	/// Stringified primary key.
	fn entity_id(&self) -> String;

	/// The workspace that owns this entity, when it has one.
	fn workspace_id(&self) -> Option<WorkspaceId>;

	/// The attribute set persisted for diffing.
	fn audit_snapshot(&self) -> Map<String, Value>;

	/// Reference stored on audit records about this entity.
	fn auditable_ref(&self) -> AuditableRef {
		AuditableRef::new(self.type_name(), self.entity_id())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	struct ContentItem {
		id: u64,
		workspace: WorkspaceId,
		title: String,
	}

	impl AuditEntity for ContentItem {
		fn type_name(&self) -> &'static str {
			"content_item"
		}

		fn entity_id(&self) -> String {
			self.id.to_string()
		}

		fn workspace_id(&self) -> Option<WorkspaceId> {
			Some(self.workspace)
		}

		fn audit_snapshot(&self) -> Map<String, Value> {
			let mut snapshot = Map::new();
			snapshot.insert("title".to_string(), json!(self.title));
			snapshot
		}
	}

	#[test]
	fn default_auditable_ref_combines_type_and_id() {
		let item = ContentItem {
			id: 7,
			workspace: WorkspaceId::generate(),
			title: "Launch teaser".to_string(),
		};
		let r = item.auditable_ref();
		assert_eq!(r.type_name, "content_item");
		assert_eq!(r.id, "7");
	}
}
