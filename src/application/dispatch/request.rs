use crate::common::{DispatchError, DispatchResult};
use crate::domains::platform::{
    BuildConfig, ServiceConfig, DEFAULT_LOG_FILTER, DEFAULT_MEMBER, DEFAULT_ROLE,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Named arguments for one operation, e.g. `service_config`, `role`, `filter_str`.
pub type ParamBag = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetServices,
    CreateService,
    GetImages,
    GetLogs,
    BuildImage,
    PushImage,
    GetServiceAccounts,
    GetPermissions,
    AddPermission,
    GetProjects,
    CheckAuth,
    RunCommand,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::GetServices,
        Operation::CreateService,
        Operation::GetImages,
        Operation::GetLogs,
        Operation::BuildImage,
        Operation::PushImage,
        Operation::GetServiceAccounts,
        Operation::GetPermissions,
        Operation::AddPermission,
        Operation::GetProjects,
        Operation::CheckAuth,
        Operation::RunCommand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetServices => "get_services",
            Operation::CreateService => "create_service",
            Operation::GetImages => "get_images",
            Operation::GetLogs => "get_logs",
            Operation::BuildImage => "build_image",
            Operation::PushImage => "push_image",
            Operation::GetServiceAccounts => "get_service_accounts",
            Operation::GetPermissions => "get_permissions",
            Operation::AddPermission => "add_permission",
            Operation::GetProjects => "get_projects",
            Operation::CheckAuth => "check_auth",
            Operation::RunCommand => "run_command",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownOperation(s.to_string()))
    }
}

/// An operation identifier plus its parameter bag.
///
/// The identifier is kept as given and only resolved when the unit runs, so an
/// unrecognized name surfaces through the failure notification like any other fault.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    operation: String,
    params: ParamBag,
}

impl OperationRequest {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: ParamBag::new(),
        }
    }

    pub fn with_params(operation: impl Into<String>, params: ParamBag) -> Self {
        Self {
            operation: operation.into(),
            params,
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn create_service(config: &ServiceConfig) -> Self {
        Self::new(Operation::CreateService.as_str()).param("service_config", json!(config))
    }

    pub fn build_image(config: &BuildConfig) -> Self {
        Self::new(Operation::BuildImage.as_str()).param("build_config", json!(config))
    }

    pub fn get_logs(filter: &str) -> Self {
        Self::new(Operation::GetLogs.as_str()).param("filter_str", filter)
    }

    pub fn push_image(image_name: &str) -> Self {
        Self::new(Operation::PushImage.as_str()).param("image_name", image_name)
    }

    pub fn add_permission(role: &str, member: &str) -> Self {
        Self::new(Operation::AddPermission.as_str())
            .param("role", role)
            .param("member", member)
    }

    pub fn run_command<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<Value> = args.into_iter().map(|a| Value::String(a.into())).collect();
        Self::new(Operation::RunCommand.as_str()).param("args", Value::Array(args))
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    pub fn resolve(&self) -> DispatchResult<Operation> {
        self.operation.parse()
    }

    /// String parameter, or `default` when the key is absent or null.
    pub fn string_param(&self, key: &str, default: &str) -> DispatchResult<String> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(DispatchError::InvalidParameter {
                key: key.to_string(),
                reason: format!("expected a string, got {}", other),
            }),
        }
    }

    /// Structured parameter; absent keys yield `T::default()`.
    pub fn typed_param<T: DeserializeOwned + Default>(&self, key: &str) -> DispatchResult<T> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| DispatchError::InvalidParameter {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn filter(&self) -> DispatchResult<String> {
        self.string_param("filter_str", DEFAULT_LOG_FILTER)
    }

    pub fn role(&self) -> DispatchResult<String> {
        self.string_param("role", DEFAULT_ROLE)
    }

    pub fn member(&self) -> DispatchResult<String> {
        self.string_param("member", DEFAULT_MEMBER)
    }
}
