use serde::{Deserialize, Serialize};

use crate::models::SongSummary;

/// Durable queue that carries playlist export requests from the API
/// process to the export consumer.
pub const EXPORT_QUEUE: &str = "export:playlists";

/// Message published on [`EXPORT_QUEUE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub playlist_id: String,
    pub target_email: String,
}

impl ExportRequest {
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Document attached to the export email as `playlist.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistExport {
    pub playlist: ExportedPlaylist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPlaylist {
    pub id: String,
    pub name: String,
    pub songs: Vec<SongSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_request_uses_camel_case_on_the_wire() {
        let req = ExportRequest {
            playlist_id: "playlist-abc".into(),
            target_email: "x@example.com".into(),
        };
        let json: serde_json::Value = serde_json::from_slice(&req.to_bytes().unwrap()).unwrap();
        assert_eq!(json["playlistId"], "playlist-abc");
        assert_eq!(json["targetEmail"], "x@example.com");
    }

    #[test]
    fn malformed_payload_is_rejected() {
        assert!(ExportRequest::from_bytes(b"{\"playlistId\":1}").is_err());
    }
}
