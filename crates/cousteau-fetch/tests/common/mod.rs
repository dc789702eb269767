use cousteau_fetch::{AtlasClient, ClientConfig};
use httpmock::MockServer;

pub fn client_for(server: &MockServer) -> AtlasClient {
    AtlasClient::new(ClientConfig {
        base_url: server.base_url(),
        ..ClientConfig::default()
    })
    .unwrap()
}
