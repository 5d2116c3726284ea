use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;

use super::session::SessionStatus;

/// A 1x1 transparent PNG standing in for a real pairing code.
const PLACEHOLDER_QR_PNG: [u8; 70] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d,
    0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
    0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4, 0x89, 0x00, 0x00, 0x00,
    0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64, 0x60, 0xf8, 0x5f,
    0x0f, 0x00, 0x02, 0x87, 0x01, 0x80, 0xeb, 0x47, 0xba, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Returns the placeholder QR image as a `data:` URI.
pub fn placeholder_qr_data_uri() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(PLACEHOLDER_QR_PNG))
}

/// Phase announced through `connection-status` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionPhase {
    QrReady,
    Authenticated,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodePayload {
    pub chip_id: String,
    pub qr_code: String,
    pub attempts: u32,
    pub url_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatusPayload {
    pub chip_id: String,
    pub status: ConnectionPhase,
    pub session: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChipConnectedPayload {
    pub chip_id: String,
    pub name: String,
    pub number: String,
    pub status: SessionStatus,
}

/// A lifecycle notification pushed to every realtime client.
///
/// Serialized as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ChipEvent {
    QrCode(QrCodePayload),
    ConnectionStatus(ConnectionStatusPayload),
    ChipConnected(ChipConnectedPayload),
}

impl ChipEvent {
    /// The event name clients listen for.
    pub fn name(&self) -> &'static str {
        match self {
            ChipEvent::QrCode(_) => "qr-code",
            ChipEvent::ConnectionStatus(_) => "connection-status",
            ChipEvent::ChipConnected(_) => "chip-connected",
        }
    }

    pub fn chip_id(&self) -> &str {
        match self {
            ChipEvent::QrCode(p) => &p.chip_id,
            ChipEvent::ConnectionStatus(p) => &p.chip_id,
            ChipEvent::ChipConnected(p) => &p.chip_id,
        }
    }

    pub fn qr_code(chip_id: &str) -> Self {
        ChipEvent::QrCode(QrCodePayload {
            chip_id: chip_id.to_string(),
            qr_code: placeholder_qr_data_uri(),
            attempts: 1,
            url_code: format!("whatsapp://qr/{}", chip_id),
        })
    }

    pub fn connection_status(chip_id: &str, status: ConnectionPhase, session: String) -> Self {
        ChipEvent::ConnectionStatus(ConnectionStatusPayload {
            chip_id: chip_id.to_string(),
            status,
            session,
        })
    }

    pub fn chip_connected(chip_id: &str, name: &str, number: &str) -> Self {
        ChipEvent::ChipConnected(ChipConnectedPayload {
            chip_id: chip_id.to_string(),
            name: name.to_string(),
            number: number.to_string(),
            status: SessionStatus::Connected,
        })
    }
}
