//! Playlist access checks.
//!
//! Two tiers: the owner may do everything, including deleting the playlist
//! and managing collaborators; collaborators may list the playlist and add
//! or remove songs. Both checks are read-only.

use crate::queries::collaborations::query_grant;
use crate::queries::playlists::query_playlist;
use crate::{Database, Error, Result};

impl Database {
    /// Succeeds only for the playlist's owner.
    pub fn authorize_owner(&self, playlist_id: &str, principal_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let playlist =
                query_playlist(conn, playlist_id)?.ok_or_else(|| Error::not_found("playlist not found"))?;
            if playlist.owner != principal_id {
                return Err(Error::forbidden("you are not allowed to access this playlist"));
            }
            Ok(())
        })
    }

    /// Succeeds for the owner and for any user holding a collaboration grant.
    pub fn authorize_collaborator(&self, playlist_id: &str, principal_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let playlist =
                query_playlist(conn, playlist_id)?.ok_or_else(|| Error::not_found("playlist not found"))?;
            if playlist.owner == principal_id {
                return Ok(());
            }
            if query_grant(conn, playlist_id, principal_id)?.is_none() {
                return Err(Error::forbidden("you are not allowed to access this playlist"));
            }
            Ok(())
        })
    }
}
