//! Network work leaves the event loop as a [`Command`] and comes back as a
//! [`TaskResult`] through an unbounded queue that `State::update` drains
//! once per frame.

use std::future::Future;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};

use crate::{
    config::EndpointConfig,
    error::{GlobeError, GlobeResult},
};

use super::{
    api::{MarkerApiClient, MarkerRecord, NewMarker, StatusReply},
    geocoding::ReverseGeocoder,
    geospatial::coordinates::GeoPoint,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Day,
    Night,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadMarkers,
    LoadBorders,
    LoadTexture(TextureKind),
    ReverseGeocode(GeoPoint),
    SaveMarker { geo: GeoPoint, name: String },
    DeleteMarker(i64),
}

#[derive(Debug)]
pub enum TaskResult {
    MarkersLoaded(GlobeResult<Vec<MarkerRecord>>),
    BordersLoaded(GlobeResult<Vec<GeoPoint>>),
    TextureLoaded {
        kind: TextureKind,
        bytes: GlobeResult<Vec<u8>>,
    },
    PlaceResolved {
        geo: GeoPoint,
        name: GlobeResult<Option<String>>,
    },
    MarkerSaved {
        geo: GeoPoint,
        reply: GlobeResult<StatusReply>,
    },
    MarkerDeleted {
        id: i64,
        reply: GlobeResult<StatusReply>,
    },
}

pub struct Dispatcher {
    api: MarkerApiClient,
    geocoder: ReverseGeocoder,
    day_texture_path: String,
    night_texture_path: String,
    sender: UnboundedSender<TaskResult>,
    receiver: UnboundedReceiver<TaskResult>,
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Runtime,
}

impl Dispatcher {
    pub fn new(endpoints: &EndpointConfig) -> GlobeResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(endpoints.user_agent.clone())
            .build()?;
        let (sender, receiver) = unbounded();

        Ok(Self {
            api: MarkerApiClient::new(http.clone(), endpoints),
            geocoder: ReverseGeocoder::new(http, endpoints),
            day_texture_path: endpoints.day_texture_path.clone(),
            night_texture_path: endpoints.night_texture_path.clone(),
            sender,
            receiver,
            #[cfg(not(target_arch = "wasm32"))]
            runtime: tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("markerglobe-net")
                .enable_all()
                .build()
                .map_err(GlobeError::Io)?,
        })
    }

    pub fn dispatch(&self, command: Command) {
        tracing::debug!(?command, "dispatching");
        let api = self.api.clone();
        match command {
            Command::LoadMarkers => {
                self.spawn(async move { TaskResult::MarkersLoaded(api.list_markers().await) })
            }
            Command::LoadBorders => {
                self.spawn(async move { TaskResult::BordersLoaded(api.border_points().await) })
            }
            Command::LoadTexture(kind) => {
                let path = match kind {
                    TextureKind::Day => self.day_texture_path.clone(),
                    TextureKind::Night => self.night_texture_path.clone(),
                };
                self.spawn(async move {
                    TaskResult::TextureLoaded {
                        kind,
                        bytes: api.fetch_bytes(&path).await,
                    }
                })
            }
            Command::ReverseGeocode(geo) => {
                let geocoder = self.geocoder.clone();
                self.spawn(async move {
                    TaskResult::PlaceResolved {
                        geo,
                        name: geocoder.place_name(geo).await,
                    }
                })
            }
            Command::SaveMarker { geo, name } => self.spawn(async move {
                let marker = NewMarker {
                    lat: geo.latitude,
                    lon: geo.longitude,
                    name,
                };
                TaskResult::MarkerSaved {
                    geo,
                    reply: api.add_marker(&marker).await,
                }
            }),
            Command::DeleteMarker(id) => self.spawn(async move {
                TaskResult::MarkerDeleted {
                    id,
                    reply: api.delete_marker(id).await,
                }
            }),
        }
    }

    /// Everything finished since the last call, without waiting.
    pub fn drain(&mut self) -> Vec<TaskResult> {
        let mut finished = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            finished.push(result);
        }
        finished
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            // the receiver only goes away when the viewer shuts down
            let _ = sender.unbounded_send(task.await);
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = TaskResult> + 'static,
    {
        let sender = self.sender.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let _ = sender.unbounded_send(task.await);
        });
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::systems::stub_server::StubServer;

    fn drain_until_some(dispatcher: &mut Dispatcher) -> Vec<TaskResult> {
        let mut results = Vec::new();
        for _ in 0..200 {
            results.extend(dispatcher.drain());
            if !results.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(25));
        }
        results
    }

    #[test]
    fn drain_is_empty_before_anything_finishes() {
        let mut dispatcher = Dispatcher::new(&EndpointConfig::default()).unwrap();
        assert!(dispatcher.drain().is_empty());
    }

    #[test]
    fn drain_returns_queued_results_in_order_then_nothing() {
        let mut dispatcher = Dispatcher::new(&EndpointConfig::default()).unwrap();
        for id in [1, 2] {
            dispatcher
                .sender
                .unbounded_send(TaskResult::MarkerDeleted {
                    id,
                    reply: Ok(StatusReply {
                        status: "deleted".to_string(),
                    }),
                })
                .unwrap();
        }

        let ids: Vec<_> = dispatcher
            .drain()
            .into_iter()
            .map(|result| match result {
                TaskResult::MarkerDeleted { id, .. } => id,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(dispatcher.drain().is_empty());
    }

    #[test]
    fn failing_backend_reports_a_status_error() {
        let server_runtime = tokio::runtime::Runtime::new().unwrap();
        let server = server_runtime
            .block_on(StubServer::reply("500 Internal Server Error", "{}"));
        let endpoints = EndpointConfig {
            api_base_url: server.base_url.clone(),
            ..EndpointConfig::default()
        };
        let mut dispatcher = Dispatcher::new(&endpoints).unwrap();
        dispatcher.dispatch(Command::LoadMarkers);

        let results = drain_until_some(&mut dispatcher);
        assert!(matches!(
            results.as_slice(),
            [TaskResult::MarkersLoaded(Err(GlobeError::Status { status, .. }))]
                if *status == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
    }
}
