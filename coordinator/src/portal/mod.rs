use actix_cors::Cors;
use actix_web::{
    dev::ServerHandle, get, middleware::Logger, web, App, HttpResponse, HttpServer, Responder,
};
use log::{error, info};
use shared::dtos::progress_dto::ProgressDto;
use tokio::task::JoinHandle;

use crate::coordinator_state::CoordinatorState;

#[get("/status")]
async fn get_status(state: web::Data<CoordinatorState>) -> impl Responder {
    HttpResponse::Ok().json(state.status())
}

#[get("/progress")]
async fn get_progress(state: web::Data<CoordinatorState>) -> impl Responder {
    let entries: Vec<ProgressDto> = state
        .progress
        .snapshot()
        .iter()
        .map(|entry| entry.to_dto())
        .collect();
    HttpResponse::Ok().json(entries)
}

/// A running status portal.
pub struct Portal {
    handle: ServerHandle,
    task: JoinHandle<()>,
}

impl Portal {
    /// Stops accepting requests and waits for in-flight ones.
    pub async fn stop(self) {
        self.handle.stop(true).await;
        if let Err(e) = self.task.await {
            error!("Portal task failed: {}", e);
        }
        info!("🌀 Portal stopped");
    }
}

/// Serves `GET /status` and `GET /progress` on `address`.
pub fn start_portal(address: &str, state: CoordinatorState) -> std::io::Result<Portal> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .service(get_status)
            .service(get_progress)
    })
    .workers(1)
    .disable_signals()
    .bind(address)?
    .run();

    info!("🌀 Portal launched at {}", address);

    let handle = server.handle();
    let task = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Portal error: {}", e);
        }
    });

    Ok(Portal { handle, task })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::test;
    use shared::{
        dtos::status_dto::StatusDto,
        graphics::color::DisplayColor,
        models::{resolution::Resolution, tile::Tile},
    };

    use crate::{aggregator::PixelView, progress::ProgressTracker};

    use super::*;

    fn state() -> CoordinatorState {
        let tracker = Arc::new(ProgressTracker::new());
        tracker.set("alpha", Tile::new(4, 0, 4), DisplayColor::new(0, 0, 255));
        CoordinatorState::new(Resolution::new(8, 4), 2, tracker, PixelView::default())
    }

    #[actix_web::test]
    async fn serves_status_and_progress() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .service(get_status)
                .service(get_progress),
        )
        .await;

        let request = test::TestRequest::get().uri("/status").to_request();
        let body: StatusDto = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body.total_tiles, 2);
        assert_eq!(body.resolution, Resolution::new(8, 4));

        let request = test::TestRequest::get().uri("/progress").to_request();
        let body: Vec<ProgressDto> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].tile, Tile::new(4, 0, 4));
    }
}
