use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use shared::constants::INVALID_IMAGE_ERROR;
use shared::events::ServerEvent;
use shared::restaurant::{
    Advertisement, AdvertisementUpdate, MenuItem, Recommendation, RecommendationInput, RestaurantConfig,
    RestaurantData,
};
use shared::validation::is_valid_image;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::broadcast::Broadcaster;
use crate::error::{AppError, AppJson};
use crate::models::MessageResponse;
use crate::storage::StorageError;
use crate::AppState;

const DEFAULT_AD_NAME: &str = "Advertisement";

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/restaurant", get(get_restaurant_data))
        .route("/restaurant/config", post(update_restaurant_config))
        .route("/advertisements", post(upload_advertisement))
        .route("/advertisements/:id", put(update_advertisement).delete(delete_advertisement))
        .route("/menu/:id", put(update_menu_item))
        .route("/recommendations", post(add_recommendation))
        .route("/recommendations/:id", put(update_recommendation).delete(delete_recommendation))
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `ad_<unique>.<ext>`, keeping the uploaded file's extension.
fn stored_image_name(original: &str) -> String {
    let ext = FsPath::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default();
    format!("ad_{}{}", new_id(), ext)
}

async fn get_restaurant_data(State(state): State<AppState>) -> Result<Json<RestaurantData>, AppError> {
    Ok(Json(state.storage.get_restaurant_data().await?))
}

async fn update_restaurant_config(
    State(state): State<AppState>,
    AppJson(config): AppJson<RestaurantConfig>,
) -> Result<Json<RestaurantConfig>, AppError> {
    config.validate()?;
    let config = state.storage.save_restaurant_config(config).await?;
    info!("🏪 Restaurant settings updated (auto switch: {})", config.enable_auto_switch);
    state.hub.publish(&ServerEvent::RestaurantConfigUpdated(config.clone()));
    Ok(Json(config))
}

fn bad_upload(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Failed to read upload: {}", e))
}

async fn upload_advertisement(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Advertisement>, AppError> {
    let mut image = None;
    let mut name = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                if !is_valid_image(field.content_type(), &file_name) {
                    return Err(AppError::Validation(INVALID_IMAGE_ERROR.to_string()));
                }
                let data = field.bytes().await.map_err(bad_upload)?;
                image = Some((file_name, data));
            }
            Some("name") => name = Some(field.text().await.map_err(bad_upload)?),
            _ => {}
        }
    }

    let (file_name, data) =
        image.ok_or_else(|| AppError::Validation("Failed to get image file: missing image field".to_string()))?;

    let filename = stored_image_name(&file_name);
    let path = state.storage.uploads_dir().join(&filename);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| StorageError::io("failed to save advertisement image", e))?;

    let now = Utc::now();
    let ad = Advertisement {
        id: new_id(),
        filename,
        name: name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_AD_NAME.to_string()),
        active: true,
        order: now.timestamp(),
        created: now,
    };

    let ad = match state.storage.add_advertisement(ad).await {
        Ok(ad) => ad,
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                warn!("Could not remove orphaned image {}: {}", path.display(), remove_err);
            }
            return Err(e.into());
        }
    };

    info!("🖼️ Advertisement {} uploaded ({} bytes)", ad.name, data.len());
    state.hub.publish(&ServerEvent::AdvertisementAdded(ad.clone()));
    Ok(Json(ad))
}

async fn update_advertisement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(update): AppJson<AdvertisementUpdate>,
) -> Result<Json<Advertisement>, AppError> {
    update.validate()?;
    let ad = state.storage.update_advertisement(&id, update).await?;
    state.hub.publish(&ServerEvent::AdvertisementUpdated(ad.clone()));
    Ok(Json(ad))
}

async fn delete_advertisement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let removed = state.storage.delete_advertisement(&id).await?;
    info!("🗑️ Advertisement {} deleted", removed.name);
    state.hub.publish(&ServerEvent::AdvertisementDeleted { id });
    Ok(Json(MessageResponse::new("Advertisement deleted successfully")))
}

async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(item): AppJson<MenuItem>,
) -> Result<Json<MenuItem>, AppError> {
    item.validate()?;
    let item = state.storage.update_menu_item(&id, item).await?;
    state.hub.publish(&ServerEvent::MenuItemUpdated(item.clone()));
    Ok(Json(item))
}

async fn add_recommendation(
    State(state): State<AppState>,
    AppJson(input): AppJson<RecommendationInput>,
) -> Result<Json<Recommendation>, AppError> {
    input.validate()?;
    let rec = state
        .storage
        .add_recommendation(input.into_recommendation(new_id(), Utc::now()))
        .await?;
    state.hub.publish(&ServerEvent::RecommendationAdded(rec.clone()));
    Ok(Json(rec))
}

async fn update_recommendation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(input): AppJson<RecommendationInput>,
) -> Result<Json<Recommendation>, AppError> {
    input.validate()?;
    let rec = state.storage.update_recommendation(&id, input).await?;
    state.hub.publish(&ServerEvent::RecommendationUpdated(rec.clone()));
    Ok(Json(rec))
}

async fn delete_recommendation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.storage.delete_recommendation(&id).await?;
    state.hub.publish(&ServerEvent::RecommendationDeleted { id });
    Ok(Json(MessageResponse::new("Recommendation deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{json_request, read_json, test_state};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tokio::sync::mpsc::Receiver;
    use tower::ServiceExt;

    const BOUNDARY: &str = "lucky-wheel-boundary";

    fn app(state: AppState) -> Router {
        Router::new().nest("/api", create_router()).with_state(state)
    }

    fn multipart_upload(file_name: &str, content_type: &str, name: Option<&str>) -> Request<Body> {
        let mut body = String::new();
        if let Some(name) = name {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\nfake-image-bytes\r\n--{BOUNDARY}--\r\n"
        ));
        Request::builder()
            .method(Method::POST)
            .uri("/api/advertisements")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn next_event(events: &mut Receiver<String>) -> Value {
        serde_json::from_str(&events.try_recv().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_upload_and_delete_advertisement() {
        let state = test_state().await;
        let mut sub = state.hub.subscribe();
        let app = app(state.clone());

        let response = app
            .clone()
            .oneshot(multipart_upload("Promo.PNG", "image/png", Some("午市套餐")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ad = read_json(response).await;
        assert_eq!(ad["name"], "午市套餐");
        assert_eq!(ad["active"], true);
        let filename = ad["filename"].as_str().unwrap().to_string();
        assert!(filename.starts_with("ad_") && filename.ends_with(".png"), "{}", filename);

        let stored = state.storage.uploads_dir().join(&filename);
        assert_eq!(std::fs::read(&stored).unwrap(), b"fake-image-bytes");
        assert_eq!(next_event(&mut sub.receiver)["type"], "advertisement_added");

        let id = ad["id"].as_str().unwrap();
        let response = app
            .oneshot(json_request(Method::DELETE, &format!("/api/advertisements/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["message"], "Advertisement deleted successfully");
        assert!(!stored.exists());
        let event = next_event(&mut sub.receiver);
        assert_eq!(event, json!({"type": "advertisement_deleted", "data": {"id": id}}));
    }

    #[tokio::test]
    async fn test_upload_name_defaults_and_type_is_checked() {
        let state = test_state().await;
        let app = app(state);

        let response = app
            .clone()
            .oneshot(multipart_upload("banner.gif", "application/octet-stream", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["name"], DEFAULT_AD_NAME);

        let response = app
            .oneshot(multipart_upload("notes.txt", "text/plain", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], INVALID_IMAGE_ERROR);
    }

    #[tokio::test]
    async fn test_recommendation_lifecycle() {
        let state = test_state().await;
        let mut sub = state.hub.subscribe();
        let app = app(state);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/recommendations",
                Some(json!({"name": "水煮鱼", "price": 58, "special": "厨师推荐"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let rec = read_json(response).await;
        assert_eq!(rec["active"], true);
        let id = rec["id"].as_str().unwrap().to_string();
        assert_eq!(next_event(&mut sub.receiver)["type"], "recommendation_added");

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/recommendations/{}", id),
                Some(json!({"name": "水煮鱼", "price": 48, "active": false})),
            ))
            .await
            .unwrap();
        let updated = read_json(response).await;
        assert_eq!(updated["price"], 48.0);
        assert_eq!(updated["active"], false);
        assert_eq!(updated["date"], rec["date"]);
        assert_eq!(next_event(&mut sub.receiver)["type"], "recommendation_updated");

        let response = app
            .clone()
            .oneshot(json_request(Method::DELETE, &format!("/api/recommendations/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(next_event(&mut sub.receiver)["type"], "recommendation_deleted");

        let response = app
            .oneshot(json_request(Method::DELETE, &format!("/api/recommendations/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(read_json(response).await["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_menu_update_and_validation() {
        let state = test_state().await;
        let app = app(state.clone());

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/menu/menu_3",
                Some(json!({"name": "酸辣汤", "price": 20, "category": "汤品", "available": false})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let item = read_json(response).await;
        assert_eq!(item["id"], "menu_3");
        let data = state.storage.get_restaurant_data().await.unwrap();
        assert!(!data.menu_items.iter().find(|m| m.id == "menu_3").unwrap().available);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/menu/menu_99",
                Some(json!({"name": "小笼包", "price": 15, "available": true})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(json_request(
                Method::PUT,
                "/api/menu/menu_1",
                Some(json!({"name": "", "price": -1, "available": true})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_restaurant_config_update_broadcasts() {
        let state = test_state().await;
        let mut sub = state.hub.subscribe();
        let app = app(state);

        let body = json!({
            "name": "好运来",
            "ad_rotation_time": 8,
            "auto_switch_time": 20,
            "enable_auto_switch": true
        });
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/restaurant/config", Some(body.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            next_event(&mut sub.receiver),
            json!({"type": "restaurant_config_updated", "data": body})
        );

        let response = app
            .oneshot(json_request(Method::GET, "/api/restaurant", None))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["config"]["name"], "好运来");
    }
}
