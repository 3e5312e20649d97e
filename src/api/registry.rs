//! The user's sending-server pool.

use super::ApiClient;
use crate::models::ServerList;
use crate::session::SessionContext;
use crate::types::{AppError, AppResult};

/// Read-only view of the servers available to the authenticated user.
pub struct ServerRegistry {
    api: ApiClient,
}

impl ServerRegistry {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch the current server set and default designation. The result
    /// is a snapshot owned by the caller; it is not cached here. Callers
    /// may degrade to "no server list" on a network error, since explicit
    /// server selection is optional (auto-select still works).
    pub async fn list_servers(&self, session: &SessionContext) -> AppResult<ServerList> {
        let token = session.require_token()?;

        let response = self
            .api
            .http()
            .get(self.api.url("/api/user/servers"))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiClient::api_error(response, "failed to fetch servers").await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Dispatch(format!("failed to parse server list: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserProfile;
    use tokio_test::assert_ok;

    fn session() -> SessionContext {
        SessionContext::new("test-token", UserProfile::default())
    }

    #[tokio::test]
    async fn test_server_pool_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/user/servers")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(
                r#"{
                    "servers": [
                        {
                            "serverId": "srv-1",
                            "serverName": "primary",
                            "serverUrl": "http://mail-1.internal:3001",
                            "serverIp": "10.0.0.4",
                            "isActive": true,
                            "isBusy": false,
                            "emailCount": 420
                        },
                        {
                            "serverId": "srv-2",
                            "serverName": "backup",
                            "serverUrl": "http://mail-2.internal:3001",
                            "serverIp": "10.0.0.5",
                            "isActive": false,
                            "isBusy": true,
                            "emailCount": 7
                        }
                    ],
                    "defaultServerId": "srv-1"
                }"#,
            )
            .create_async()
            .await;

        let registry = ServerRegistry::new(ApiClient::new(server.url()));
        let list = tokio_test::assert_ok!(registry.list_servers(&session()).await);
        assert_eq!(list.servers.len(), 2);
        assert_eq!(list.default_server().unwrap().server_id, "srv-1");
        assert!(list.servers[1].is_busy);
        assert!(!list.servers[1].is_active);
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/user/servers")
            .expect(0)
            .create_async()
            .await;

        let registry = ServerRegistry::new(ApiClient::new(server.url()));
        let err = registry
            .list_servers(&SessionContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_a_network_error() {
        let registry = ServerRegistry::new(ApiClient::new("http://127.0.0.1:9"));
        let err = registry.list_servers(&session()).await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
