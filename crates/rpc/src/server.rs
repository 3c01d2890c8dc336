//! RPC server: dispatches requests to the goal service over stdio or a
//! Unix socket.

use std::path::PathBuf;
use std::sync::Arc;

use goaltrack_core::{GoalId, OwnerId, TenantId};
use goaltrack_engine::{GoalError, GoalService};
use goaltrack_storage::Storage;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::{debug, error, info};

use crate::protocol::{RpcEnvelope, RpcError, RpcRequest, RpcResponse};

/// RPC server configuration.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Data directory of the JSON backend
    pub data_dir: PathBuf,
    /// Tenant the data directory is scoped to
    pub tenant: Option<TenantId>,
    /// Server name reported by `ping`
    pub server_name: String,
    /// Server version
    pub version: String,
    /// Unix socket path, stdio when unset
    pub socket_path: Option<PathBuf>,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            data_dir: ".goaltrack".into(),
            tenant: None,
            server_name: "goaltrack".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            socket_path: None,
        }
    }
}

/// Goal tracking RPC server.
pub struct RpcServer<S: Storage> {
    config: RpcServerConfig,
    service: GoalService<S>,
}

impl<S: Storage + 'static> RpcServer<S> {
    /// Create a server in front of `service`.
    pub fn new(config: RpcServerConfig, service: GoalService<S>) -> Self {
        Self { config, service }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &RpcServerConfig {
        &self.config
    }

    /// Answer one request line. Blank lines get no answer.
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        if line.trim().is_empty() {
            return None;
        }
        let envelope: RpcEnvelope = match serde_json::from_str(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                return Some(RpcResponse::err(Value::Null, RpcError::invalid_argument(format!("parse error: {}", e))));
            }
        };
        Some(self.handle_envelope(envelope).await)
    }

    /// Answer a decoded envelope.
    pub async fn handle_envelope(&self, envelope: RpcEnvelope) -> RpcResponse {
        let id = envelope.id.clone();
        let request = match envelope.request() {
            Ok(request) => request,
            Err(e) => {
                error!("Invalid {} request: {}", envelope.method, e);
                return RpcResponse::err(id, RpcError::invalid_argument(format!("{}: {}", envelope.method, e)));
            }
        };

        debug!("RPC {} (id {})", envelope.method, id);
        match self.dispatch(envelope.token.as_deref(), request).await {
            Ok(result) => RpcResponse::ok(id, result),
            Err(e) => {
                match &e {
                    GoalError::Internal(_) => error!("{} failed: {}", envelope.method, e),
                    _ => debug!("{} rejected: {}", envelope.method, e),
                }
                RpcResponse::err(id, e.into())
            }
        }
    }

    async fn dispatch(&self, token: Option<&str>, request: RpcRequest) -> goaltrack_engine::Result<Value> {
        let service = &self.service;
        let caller = || service.authenticate(token);
        match request {
            RpcRequest::Ping => Ok(json!({
                "status": "pong",
                "serverInfo": {
                    "name": self.config.server_name,
                    "version": self.config.version
                }
            })),
            RpcRequest::ListGoals(p) => {
                let goals = service.list_goals(&caller().await?, &OwnerId::new(p.owner_id)).await?;
                Ok(json!({ "goals": goals }))
            }
            RpcRequest::GetGoal(p) => {
                let caller = caller().await?;
                let goal = service.get_goal(&caller, &OwnerId::new(p.owner_id), parse_goal_id(&p.goal_id)?).await?;
                Ok(json!({ "goal": goal }))
            }
            RpcRequest::CreateGoal(p) => {
                let id = service.create_goal(&caller().await?, &OwnerId::new(p.owner_id), p.goal).await?;
                Ok(json!({ "id": id }))
            }
            RpcRequest::UpdateGoal(p) => {
                let caller = caller().await?;
                let goal_id = parse_goal_id(&p.goal_id)?;
                let id = service.update_goal(&caller, &OwnerId::new(p.owner_id), goal_id, p.changes).await?;
                Ok(json!({ "id": id }))
            }
            RpcRequest::DeleteGoal(p) => {
                let caller = caller().await?;
                service.delete_goal(&caller, &OwnerId::new(p.owner_id), parse_goal_id(&p.goal_id)?).await?;
                Ok(json!({}))
            }
            RpcRequest::SweepExpired(p) => {
                let count = service.sweep_expired(&caller().await?, &OwnerId::new(p.owner_id)).await?;
                Ok(json!({ "expiredCount": count }))
            }
            RpcRequest::SpawnDailyInstances(p) => {
                let count = service.spawn_daily_instances(&caller().await?, &OwnerId::new(p.owner_id)).await?;
                Ok(json!({ "spawnedCount": count }))
            }
        }
    }

    /// Serve requests from `reader`, one JSON object per line, until EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let response_json = serde_json::to_string(&response)?;
            if let Err(e) = writer.write_all(response_json.as_bytes()).await {
                error!("Failed to write response: {}", e);
                break;
            }
            if let Err(e) = writer.write_all(b"\n").await {
                error!("Failed to write newline: {}", e);
                break;
            }
            if let Err(e) = writer.flush().await {
                error!("Failed to flush: {}", e);
            }
        }
        Ok(())
    }

    /// Serve stdin/stdout until EOF.
    pub async fn start_with_stdio(&self) -> anyhow::Result<()> {
        info!("Starting {} RPC server v{} (stdio transport)", self.config.server_name, self.config.version);
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
        info!("RPC server stopped");
        Ok(())
    }

    /// Serve connections on a Unix socket until interrupted.
    pub async fn start_with_socket(self: Arc<Self>, socket_path: &std::path::Path) -> anyhow::Result<()> {
        info!("Starting {} RPC server v{} (socket transport)", self.config.server_name, self.config.version);

        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }
        let listener = tokio::net::UnixListener::bind(socket_path)?;

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream).await {
                                    error!("Connection failed: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    break;
                }
            }
        }

        info!("RPC server stopped");
        Ok(())
    }

    async fn handle_connection(&self, stream: UnixStream) -> anyhow::Result<()> {
        let (reader, writer) = stream.into_split();
        self.serve(BufReader::new(reader), writer).await
    }
}

fn parse_goal_id(raw: &str) -> goaltrack_engine::Result<GoalId> {
    raw.parse()
        .map_err(|e| GoalError::InvalidArgument(format!("invalid goalId '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use goaltrack_core::{Calendar, FixedClock, Time};
    use goaltrack_engine::{Caller, EngineContext, Role, StaticAuthorizer};
    use goaltrack_storage::{JsonStorage, MemoryStorage};

    fn day(s: &str) -> Time {
        Calendar::default().parse_local_date(s).unwrap()
    }

    fn authorizer() -> StaticAuthorizer {
        StaticAuthorizer::new()
            .with_token("t-ana", Caller::new("ana", Role::Student))
            .with_token("t-mentor", Caller::new("mentor-1", Role::Mentor))
            .assign("mentor-1", "ana")
    }

    fn server() -> RpcServer<MemoryStorage> {
        let clock = Arc::new(FixedClock::new(day("2026-01-05")));
        let context = EngineContext::with_calendar(MemoryStorage::new(), clock, Calendar::default());
        RpcServer::new(RpcServerConfig::default(), GoalService::new(context, Arc::new(authorizer())))
    }

    async fn call<S: Storage + 'static>(server: &RpcServer<S>, request: Value) -> Value {
        let response = server.handle_line(&request.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    fn create(owner: &str) -> Value {
        json!({
            "ownerId": owner,
            "type": "questions",
            "name": "Questions",
            "targetValue": 30,
            "windowStart": "2026-01-01",
            "windowEnd": "2026-01-31",
            "isRecurring": true
        })
    }

    #[tokio::test]
    async fn test_ping_and_blank_lines() {
        let server = server();
        let pong = call(&server, json!({"id": "1", "method": "ping"})).await;
        assert_eq!(pong["result"]["status"], "pong");
        assert_eq!(pong["result"]["serverInfo"]["name"], "goaltrack");
        assert!(server.handle_line("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_unparseable_line_gets_null_id() {
        let server = server();
        let response = serde_json::to_value(server.handle_line("{not json").await.unwrap()).unwrap();
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["code"], "invalid-argument");
    }

    #[tokio::test]
    async fn test_error_codes() {
        let server = server();
        let unauth = call(&server, json!({"id": "1", "method": "listGoals", "params": {"ownerId": "ana"}})).await;
        assert_eq!(unauth["error"]["code"], "unauthenticated");

        let denied = call(
            &server,
            json!({"id": "2", "token": "t-ana", "method": "listGoals", "params": {"ownerId": "bruno"}}),
        )
        .await;
        assert_eq!(denied["error"]["code"], "permission-denied");

        let bad_id = call(
            &server,
            json!({"id": "3", "token": "t-ana", "method": "getGoal", "params": {"ownerId": "ana", "goalId": "nope"}}),
        )
        .await;
        assert_eq!(bad_id["error"]["code"], "invalid-argument");

        let missing = call(
            &server,
            json!({"id": "4", "token": "t-ana", "method": "deleteGoal",
                   "params": {"ownerId": "ana", "goalId": GoalId::new().to_string()}}),
        )
        .await;
        assert_eq!(missing["error"]["code"], "not-found");
        assert_eq!(missing["id"], "4");

        let unknown = call(&server, json!({"id": "5", "token": "t-ana", "method": "dropGoals"})).await;
        assert_eq!(unknown["error"]["code"], "invalid-argument");
        assert_eq!(unknown["id"], "5");
    }

    #[tokio::test]
    async fn test_recurring_goal_round_trip() {
        let server = server();
        let created = call(&server, json!({"id": "1", "token": "t-mentor", "method": "createGoal", "params": create("ana")})).await;
        let template_id = created["result"]["id"].as_str().unwrap().to_string();

        let listed = call(&server, json!({"id": "2", "token": "t-ana", "method": "listGoals", "params": {"ownerId": "ana"}})).await;
        let goals = listed["result"]["goals"].as_array().unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0]["parentGoalId"], template_id.as_str());
        assert_eq!(goals[0]["name"], "Questions - 05/01/2026");
        assert_eq!(goals[0]["createdBy"], "mentor-1");

        let spawned = call(
            &server,
            json!({"id": "3", "token": "t-ana", "method": "spawnDailyInstances", "params": {"ownerId": "ana"}}),
        )
        .await;
        assert_eq!(spawned["result"]["spawnedCount"], 0);

        let updated = call(
            &server,
            json!({"id": "4", "token": "t-ana", "method": "updateGoal",
                   "params": {"ownerId": "ana", "goalId": template_id, "isRecurring": false}}),
        )
        .await;
        assert_eq!(updated["result"]["id"], template_id.as_str());

        let listed = call(&server, json!({"id": "5", "token": "t-ana", "method": "listGoals", "params": {"ownerId": "ana"}})).await;
        let goals = listed["result"]["goals"].as_array().unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0]["id"], template_id.as_str());

        let swept = call(&server, json!({"id": "6", "token": "t-ana", "method": "sweepExpired", "params": {"ownerId": "ana"}})).await;
        assert_eq!(swept["result"]["expiredCount"], 0);
    }

    #[tokio::test]
    async fn test_serve_over_json_backend() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path(), Some(&TenantId::new("acme")), Calendar::default()).await.unwrap();
        let clock = Arc::new(FixedClock::new(day("2026-01-05")));
        let context = EngineContext::with_calendar(storage, clock, Calendar::default());
        let server = RpcServer::new(RpcServerConfig::default(), GoalService::new(context, Arc::new(authorizer())));

        let input = [
            json!({"id": "1", "token": "t-ana", "method": "createGoal", "params": create("ana")}).to_string(),
            String::new(),
            json!({"id": "2", "token": "t-ana", "method": "listGoals", "params": {"ownerId": "ana"}}).to_string(),
        ]
        .join("\n");
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1]["result"]["goals"].as_array().unwrap().len(), 1);
        assert!(dir.path().join("mentorias/acme/owners/ana/goals").is_dir());
    }
}
