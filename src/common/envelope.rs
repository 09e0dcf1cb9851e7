use serde::Serialize;
use std::fmt;

/// Operation family an envelope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Services,
    ServiceCreated,
    Images,
    Logs,
    BuildStarted,
    PushCompleted,
    ServiceAccounts,
    Permissions,
    PermissionAdded,
    Projects,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Services => "services",
            ResultKind::ServiceCreated => "service_created",
            ResultKind::Images => "images",
            ResultKind::Logs => "logs",
            ResultKind::BuildStarted => "build_started",
            ResultKind::PushCompleted => "push_completed",
            ResultKind::ServiceAccounts => "service_accounts",
            ResultKind::Permissions => "permissions",
            ResultKind::PermissionAdded => "permission_added",
            ResultKind::Projects => "projects",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub status: String,
    pub url: String,
    pub revision: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub name: String,
    pub format: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub severity: String,
    pub text: String,
    pub resource_type: String,
}

/// Handle of a long-running remote operation (service creation, build).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationHandle {
    pub operation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceAccountRecord {
    pub email: String,
    pub display_name: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingRecord {
    pub role: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub name: String,
    pub display_name: String,
    pub state: String,
}

/// One payload entry. Which variant appears is determined by the envelope's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Service(ServiceRecord),
    Image(ImageRecord),
    Log(LogRecord),
    Operation(OperationHandle),
    Message(MessageRecord),
    ServiceAccount(ServiceAccountRecord),
    Binding(BindingRecord),
    Project(ProjectRecord),
}

/// Uniform value returned by every gateway list/mutation method.
///
/// `payload` is only meaningful when `ok` is true; `error` only when it is false.
/// Failed envelopes always carry an empty payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEnvelope {
    pub kind: ResultKind,
    pub ok: bool,
    pub payload: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEnvelope {
    pub fn success(kind: ResultKind, payload: Vec<Record>) -> Self {
        Self {
            kind,
            ok: true,
            payload,
            error: None,
        }
    }

    pub fn failure(kind: ResultKind, error: impl fmt::Display) -> Self {
        Self {
            kind,
            ok: false,
            payload: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Checks `ok` first, as every consumer must.
    pub fn into_result(self) -> Result<Vec<Record>, String> {
        if self.ok {
            Ok(self.payload)
        } else {
            Err(self.error.unwrap_or_default())
        }
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.payload.iter().filter_map(|r| match r {
            Record::Service(s) => Some(s),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRecord> {
        self.payload.iter().filter_map(|r| match r {
            Record::Image(i) => Some(i),
            _ => None,
        })
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogRecord> {
        self.payload.iter().filter_map(|r| match r {
            Record::Log(l) => Some(l),
            _ => None,
        })
    }

    /// First operation handle or message text, for single-record kinds.
    pub fn summary(&self) -> Option<&str> {
        self.payload.iter().find_map(|r| match r {
            Record::Operation(h) => Some(h.operation.as_str()),
            Record::Message(m) => Some(m.message.as_str()),
            _ => None,
        })
    }
}

/// Outcome of a default-credential check. Derived fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Captured result of a raw platform CLI invocation. Success is exit code zero only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub ok: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_envelope_has_empty_payload() {
        let env = ResultEnvelope::failure(ResultKind::Images, "boom");
        assert!(!env.ok);
        assert!(env.payload.is_empty());
        assert_eq!(env.into_result(), Err("boom".to_string()));
    }

    #[test]
    fn serializes_kind_in_snake_case() {
        let env = ResultEnvelope::success(
            ResultKind::BuildStarted,
            vec![Record::Operation(OperationHandle {
                operation: "operations/123".into(),
            })],
        );
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["kind"], "build_started");
        assert_eq!(json["payload"][0]["operation"], "operations/123");
        assert!(json.get("error").is_none());
        assert_eq!(env.summary(), Some("operations/123"));
    }
}
