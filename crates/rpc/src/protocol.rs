//! Wire types: request envelope, method table and response envelope.

use goaltrack_engine::{CreateGoalRequest, GoalError, UpdateGoalRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request line as received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEnvelope {
    /// Echoed back in the response
    #[serde(default)]
    pub id: Value,
    /// Caller credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl RpcEnvelope {
    /// Decode the method and its parameters.
    pub fn request(&self) -> Result<RpcRequest, serde_json::Error> {
        let mut tagged = serde_json::Map::new();
        tagged.insert("method".to_string(), Value::String(self.method.clone()));
        if !self.params.is_null() {
            tagged.insert("params".to_string(), self.params.clone());
        }
        serde_json::from_value(Value::Object(tagged))
    }
}

/// Parameters naming an owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerParams {
    /// Goal owner
    pub owner_id: String,
}

/// Parameters naming one goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalParams {
    /// Goal owner
    pub owner_id: String,
    /// Goal id
    pub goal_id: String,
}

/// Parameters of `createGoal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalParams {
    /// Goal owner
    pub owner_id: String,
    /// Goal fields
    #[serde(flatten)]
    pub goal: CreateGoalRequest,
}

/// Parameters of `updateGoal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalParams {
    /// Goal owner
    pub owner_id: String,
    /// Goal id
    pub goal_id: String,
    /// Fields to change
    #[serde(flatten)]
    pub changes: UpdateGoalRequest,
}

/// RPC methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum RpcRequest {
    /// Visible goals of an owner
    ListGoals(OwnerParams),
    /// One goal
    GetGoal(GoalParams),
    /// Create a goal
    CreateGoal(CreateGoalParams),
    /// Partially update a goal
    UpdateGoal(UpdateGoalParams),
    /// Delete a goal
    DeleteGoal(GoalParams),
    /// Expire closed goals of an owner
    SweepExpired(OwnerParams),
    /// Spawn today's recurring instances of an owner
    SpawnDailyInstances(OwnerParams),
    /// Liveness check, no token needed
    Ping,
}

/// Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Request id, null when the request could not be read
    pub id: Value,
    /// Result data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Successful response.
    pub fn ok(id: Value, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    /// Failed response.
    pub fn err(id: Value, error: RpcError) -> Self {
        Self { id, result: None, error: Some(error) }
    }
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// One of `invalid-argument`, `not-found`, `permission-denied`,
    /// `unauthenticated`, `internal`
    pub code: String,
    /// Human-readable detail
    pub message: String,
}

impl RpcError {
    /// Error for a request that could not be decoded.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self { code: "invalid-argument".to_string(), message: message.into() }
    }
}

impl From<GoalError> for RpcError {
    fn from(e: GoalError) -> Self {
        let message = match &e {
            // Storage details stay in the server log.
            GoalError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        Self { code: e.code().to_string(), message }
    }
}
