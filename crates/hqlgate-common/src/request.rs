use serde::{Deserialize, Serialize};

/// A validated gateway request.
///
/// Carries the query text and the name of the target backend cluster.
/// Instances are created per incoming call by the HTTP layer after field
/// validation and discarded once the response is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// The HQL query text
    pub hql: String,
    /// Name of the backend cluster to route to
    pub cluster: String,
}

impl GatewayRequest {
    pub fn new(hql: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            hql: hql.into(),
            cluster: cluster.into(),
        }
    }
}
