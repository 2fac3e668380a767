pub(crate) mod albums;
pub(crate) mod collaborations;
pub(crate) mod likes;
pub(crate) mod playlists;
pub(crate) mod songs;
pub(crate) mod users;
