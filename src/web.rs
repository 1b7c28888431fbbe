//! Transport collaborator: forwards engine results to connected clients over
//! SSE and serves the latest per-settlement view as JSON. The engine itself
//! never touches this layer; it only emits events.

use std::{
    collections::BTreeMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::{
    engine::Engine,
    events::{EngineEvent, PopulationUpdate, ProductionUpdate},
    world::WorldState,
};

#[derive(Clone, Default, Serialize)]
struct SettlementView {
    production: Option<ProductionUpdate>,
    population: Option<PopulationUpdate>,
}

#[derive(Serialize)]
struct StateEnvelope {
    scenario: String,
    settlements: BTreeMap<u64, SettlementView>,
}

#[derive(Clone)]
struct AppState {
    scenario_name: String,
    events: broadcast::Sender<EngineEvent>,
    board: Arc<Mutex<BTreeMap<u64, SettlementView>>>,
}

pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// How often the realtime loop evaluates the scheduler. Sub-second so a
    /// boundary is never missed; refiring within a second is guarded.
    pub poll_interval: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            poll_interval: Duration::from_millis(250),
        }
    }
}

pub async fn serve(mut engine: Engine, mut world: WorldState, config: WebConfig) -> Result<()> {
    let scenario_name = engine.scenario_name().to_string();
    let events = engine.event_sender();
    let board: Arc<Mutex<BTreeMap<u64, SettlementView>>> = Arc::new(Mutex::new(BTreeMap::new()));

    let mut board_rx = engine.subscribe();
    let board_for_task = board.clone();
    tokio::spawn(async move {
        while let Ok(event) = board_rx.recv().await {
            let mut guard = match board_for_task.lock() {
                Ok(guard) => guard,
                Err(_) => break,
            };
            let view = guard.entry(event.settlement_id()).or_default();
            match event {
                EngineEvent::Production(update) => view.production = Some(update),
                EngineEvent::Population(update) => view.population = Some(update),
                EngineEvent::Disaster(_) | EngineEvent::Repair(_) => {}
            }
        }
    });

    let poll = config.poll_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll);
        loop {
            ticker.tick().await;
            engine.step(&mut world, Utc::now().timestamp());
        }
    });

    let state = Arc::new(AppState {
        scenario_name,
        events,
        board,
    });

    let router = Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/events", get(stream_events))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(%addr, "settlement engine serving");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let settlements = state
        .board
        .lock()
        .map(|guard| guard.clone())
        .unwrap_or_default();
    Json(StateEnvelope {
        scenario: state.scenario_name.clone(),
        settlements,
    })
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => serde_json::to_string(&event)
            .ok()
            .map(|payload| Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
