use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{albums, auth, collaborations, exports, likes, playlists, songs};

/// Every API route plus the static cover directory. Transport layers
/// (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/users", post(auth::register))
        .route("/users/{id}", get(auth::get_user))
        .route(
            "/authentications",
            post(auth::login).put(auth::refresh).delete(auth::logout),
        )
        .route("/albums", post(albums::create_album))
        .route(
            "/albums/{id}",
            get(albums::get_album)
                .put(albums::update_album)
                .delete(albums::delete_album),
        )
        .route("/albums/{id}/covers", post(albums::upload_cover))
        .route("/albums/{id}/likes", get(likes::get_likes))
        .route("/songs", post(songs::create_song).get(songs::list_songs))
        .route(
            "/songs/{id}",
            get(songs::get_song)
                .put(songs::update_song)
                .delete(songs::delete_song),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/albums/{id}/likes", post(likes::toggle_like))
        .route(
            "/playlists",
            post(playlists::create_playlist).get(playlists::list_playlists),
        )
        .route("/playlists/{id}", axum::routing::delete(playlists::delete_playlist))
        .route(
            "/playlists/{id}/songs",
            post(playlists::add_song)
                .get(playlists::list_songs)
                .delete(playlists::remove_song),
        )
        .route("/playlists/{id}/activities", get(playlists::list_activities))
        .route(
            "/collaborations",
            post(collaborations::add_collaborator).delete(collaborations::remove_collaborator),
        )
        .route("/export/playlists/{id}", post(exports::export_playlist))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads/images", ServeDir::new(state.covers.dir()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use openmusic_db::queue::{AckMode, QueueTransport};
    use openmusic_types::events::{EXPORT_QUEUE, ExportRequest};

    use crate::testing::TestApp;

    #[tokio::test]
    async fn road_trip_scenario() {
        let app = TestApp::new().await;
        let (_, alice) = app.login_as("alice").await;
        let (bob_id, bob) = app.login_as("bob").await;
        let song = app.create_song("Fix You").await;

        let (status, _, body) = app
            .call("POST", "/playlists", Some(&alice), Some(json!({ "name": "Road Trip" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let playlist = body["data"]["playlistId"].as_str().unwrap().to_string();
        assert!(playlist.starts_with("playlist-"));

        let songs_uri = format!("/playlists/{playlist}/songs");
        let (status, _, _) = app
            .call("POST", &songs_uri, Some(&bob), Some(json!({ "songId": song })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, body) = app
            .call(
                "POST",
                "/collaborations",
                Some(&alice),
                Some(json!({ "playlistId": playlist, "userId": bob_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["data"]["collaborationId"].as_str().unwrap().starts_with("collaboration-"));

        let (status, _, _) = app
            .call("POST", &songs_uri, Some(&bob), Some(json!({ "songId": song })))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _, _) = app
            .call("POST", &songs_uri, Some(&bob), Some(json!({ "songId": song })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _, body) = app.call("GET", &songs_uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["playlist"]["username"], "alice");
        assert_eq!(body["data"]["playlist"]["songs"][0]["title"], "Fix You");

        let (status, _, body) = app.call("GET", "/playlists", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["playlists"][0]["id"], Value::String(playlist.clone()));

        let (status, _, _) = app
            .call("DELETE", &songs_uri, Some(&bob), Some(json!({ "songId": song })))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = app
            .call("GET", &format!("/playlists/{playlist}/activities"), Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["playlistId"], Value::String(playlist.clone()));
        let activities = body["data"]["activities"].as_array().unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0]["username"], "bob");
        assert_eq!(activities[0]["action"], "add");
        assert_eq!(activities[1]["action"], "delete");

        // only the owner may delete
        let (status, _, _) = app
            .call("DELETE", &format!("/playlists/{playlist}"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _, _) = app
            .call("DELETE", &format!("/playlists/{playlist}"), Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = TestApp::new().await;

        let (status, _, body) = app.call("GET", "/playlists", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "fail");

        let (status, _, _) = app.call("GET", "/playlists", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authentication_lifecycle() {
        let app = TestApp::new().await;
        app.register("alice").await;

        let (status, _, _) = app
            .call(
                "POST",
                "/authentications",
                None,
                Some(json!({ "username": "alice", "password": "wrong" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, body) = app
            .call(
                "POST",
                "/authentications",
                None,
                Some(json!({ "username": "alice", "password": "secret-password" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

        let (status, _, body) = app
            .call("PUT", "/authentications", None, Some(json!({ "refreshToken": refresh })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["accessToken"].is_string());

        let (status, _, _) = app
            .call("DELETE", "/authentications", None, Some(json!({ "refreshToken": refresh })))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = app
            .call("PUT", "/authentications", None, Some(json!({ "refreshToken": refresh })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_body_keys_are_rejected() {
        let app = TestApp::new().await;

        let (status, _, body) = app
            .call(
                "POST",
                "/albums",
                None,
                Some(json!({ "name": "Ghost Stories", "year": 2014, "label": "Parlophone" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let app = TestApp::new().await;
        app.register("alice").await;

        let (status, _, body) = app
            .call(
                "POST",
                "/users",
                None,
                Some(json!({ "username": "alice", "password": "x", "fullname": "Other" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn export_is_queued_only_for_permitted_users() {
        let app = TestApp::new().await;
        let (_, alice) = app.login_as("alice").await;
        let (_, mallory) = app.login_as("mallory").await;

        let (_, _, body) = app
            .call("POST", "/playlists", Some(&alice), Some(json!({ "name": "Road Trip" })))
            .await;
        let playlist = body["data"]["playlistId"].as_str().unwrap().to_string();
        let uri = format!("/export/playlists/{playlist}");

        let (status, _, _) = app
            .call("POST", &uri, Some(&mallory), Some(json!({ "targetEmail": "m@example.com" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(app.queue.depth(EXPORT_QUEUE).unwrap(), 0);

        let (status, _, _) = app
            .call("POST", &uri, Some(&alice), Some(json!({ "targetEmail": "not-an-email" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = app
            .call("POST", &uri, Some(&alice), Some(json!({ "targetEmail": "alice@example.com" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let delivery = app.queue.receive(EXPORT_QUEUE, AckMode::Auto).unwrap().unwrap();
        let request = ExportRequest::from_bytes(&delivery.payload).unwrap();
        assert_eq!(request.playlist_id, playlist);
        assert_eq!(request.target_email, "alice@example.com");
    }

    #[tokio::test]
    async fn like_count_is_cached_until_toggled() {
        let app = TestApp::new().await;
        let (_, alice) = app.login_as("alice").await;
        let album = app.create_album().await;
        let uri = format!("/albums/{album}/likes");

        let (status, _, _) = app.call("POST", &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, headers, body) = app.call("GET", &uri, None, None).await;
        assert_eq!(body["data"]["likes"], 1);
        assert!(headers.get("x-data-source").is_none());

        let (_, headers, body) = app.call("GET", &uri, None, None).await;
        assert_eq!(body["data"]["likes"], 1);
        assert_eq!(headers.get("x-data-source").unwrap(), "cache");

        app.call("POST", &uri, Some(&alice), None).await;
        let (_, headers, body) = app.call("GET", &uri, None, None).await;
        assert_eq!(body["data"]["likes"], 0);
        assert!(headers.get("x-data-source").is_none());
    }

    #[tokio::test]
    async fn cover_upload_replaces_the_previous_file() {
        let app = TestApp::new().await;
        let album = app.create_album().await;
        let uri = format!("/albums/{album}/covers");

        let (status, _, _) = app.upload(&uri, "text/plain", b"hello".to_vec()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = app.upload(&uri, "image/png", vec![0u8; 512_001]).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (status, _, _) = app.upload(&uri, "image/png", b"first".to_vec()).await;
        assert_eq!(status, StatusCode::CREATED);
        let first = app.cover_files();
        assert_eq!(first.len(), 1);

        // file names carry a millisecond timestamp
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (status, _, _) = app.upload(&uri, "image/jpeg", b"second".to_vec()).await;
        assert_eq!(status, StatusCode::CREATED);
        let second = app.cover_files();
        assert_eq!(second.len(), 1);
        assert_ne!(first, second);
        assert!(second[0].ends_with(".jpg"));

        let (_, _, body) = app.call("GET", &format!("/albums/{album}"), None, None).await;
        let cover_url = body["data"]["album"]["coverUrl"].as_str().unwrap();
        assert!(cover_url.ends_with(&format!("/uploads/images/{}", second[0])));

        let (status, _, _) = app.call("GET", &format!("/uploads/images/{}", second[0]), None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn deleting_a_song_removes_it_from_playlists() {
        let app = TestApp::new().await;
        let (_, alice) = app.login_as("alice").await;
        let song = app.create_song("Yellow").await;

        let (_, _, body) = app
            .call("POST", "/playlists", Some(&alice), Some(json!({ "name": "Mix" })))
            .await;
        let playlist = body["data"]["playlistId"].as_str().unwrap().to_string();
        let songs_uri = format!("/playlists/{playlist}/songs");
        app.call("POST", &songs_uri, Some(&alice), Some(json!({ "songId": song })))
            .await;

        let (status, _, _) = app.call("DELETE", &format!("/songs/{song}"), None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, _, body) = app.call("GET", &songs_uri, Some(&alice), None).await;
        assert_eq!(body["data"]["playlist"]["songs"], json!([]));
    }

    #[tokio::test]
    async fn song_search_filters_case_insensitively() {
        let app = TestApp::new().await;
        app.create_song("Fix You").await;
        app.create_song("Yellow").await;

        let (status, _, body) = app.call("GET", "/songs?title=fix", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let songs = body["data"]["songs"].as_array().unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0]["title"], "Fix You");

        let (_, _, body) = app.call("GET", "/songs?performer=nobody", None, None).await;
        assert_eq!(body["data"]["songs"], json!([]));
    }
}
