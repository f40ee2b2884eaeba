use std::io;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ntex::web;
use serde::Serialize;
use spdlog::info;

use crate::config::Config;
use crate::post::SiteInfo;
use crate::post_index::PostIndex;

pub struct AppState {
    pub index: Arc<PostIndex>,
    pub site: SiteInfo,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn post_summaries(index: &PostIndex) -> Vec<PostSummary> {
    index.list()
        .iter()
        .map(|post| PostSummary {
            id: post.id.clone(),
            title: post.title(),
            snippet: post.snippet(),
            created_at: post.metadata.created_at,
            updated_at: post.metadata.updated_at,
        })
        .collect()
}

fn not_found(id: &str) -> web::HttpResponse {
    web::HttpResponse::NotFound()
        .content_type("text/plain; charset=utf-8")
        .body(format!("Post {} not found", id))
}

#[web::get("/posts")]
async fn list(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    match serde_json::to_string(&post_summaries(&state.index)) {
        Ok(body) => web::HttpResponse::Ok()
            .content_type("application/json")
            .body(body),
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error listing posts: {}", e)),
    }
}

#[web::get("/p/{id}")]
async fn view(id: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    match state.index.get(id.as_str()) {
        Some(post) => web::HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(post.html.clone()),
        None => not_found(id.as_str()),
    }
}

#[web::get("/p/{id}/ld")]
async fn structured_data(id: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    match state.index.get(id.as_str()) {
        Some(post) => web::HttpResponse::Ok()
            .content_type("application/ld+json")
            .body(post.structured_data(&state.site)),
        None => not_found(id.as_str()),
    }
}

/// Serves an index that was fully loaded beforehand.
pub async fn server_run(config: &Config, index: Arc<PostIndex>) -> io::Result<()> {
    let bind_addr = config.server.address.clone();
    let bind_port = config.server.port;
    info!("Serving {} posts on {}:{}", index.len(), bind_addr, bind_port);

    let app_state = Arc::new(AppState {
        index,
        site: config.site_info(),
    });

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .service(list)
            .service(view)
            .service(structured_data)
    })
        .bind((bind_addr, bind_port))?
        .run()
        .await
}
