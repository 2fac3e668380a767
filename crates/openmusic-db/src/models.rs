/// Database row types for entities whose stored shape differs from the
/// API shape (password hashes, raw cover file names, owner ids).
/// Read projections that already match the API live in openmusic-types.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub fullname: String,
}

pub struct AlbumRow {
    pub id: String,
    pub name: String,
    pub year: i32,
    /// Stored file name in blob storage, not a URL.
    pub cover: Option<String>,
}

pub struct PlaylistRow {
    pub id: String,
    pub name: String,
    pub owner: String,
}

/// Writable song columns, shared by insert and update.
#[derive(Debug, Clone)]
pub struct SongFields {
    pub title: String,
    pub year: i32,
    pub performer: String,
    pub genre: String,
    pub duration: Option<i32>,
    pub album_id: Option<String>,
}

/// Which branch an album like toggle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}
