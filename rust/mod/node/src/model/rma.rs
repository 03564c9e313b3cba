use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ident::{ComponentId, RmaId};

/// One vendor-return episode for a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RmaRecord {
    pub id: RmaId,

    pub component: ComponentId,

    /// Vendor's RMA number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    pub send_time: DateTime<Utc>,

    /// Unset while the component is still with the vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recv_time: Option<DateTime<Utc>>,
}

impl RmaRecord {
    pub fn is_outstanding(&self) -> bool {
        self.recv_time.is_none()
    }
}

/// Input for sending a component out.
#[derive(Debug, Clone)]
pub struct RmaShipment {
    pub number: Option<String>,
    pub company: Option<String>,
    pub send_time: DateTime<Utc>,
}
