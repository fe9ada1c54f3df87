use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    config::HttpConfig,
    contract::{self, ContractCall},
    domain::{
        id::TrackId,
        principal::Principal,
        track::{Track, TrackEvent},
    },
    http::error::ApiError,
    registry::operations::Registry,
};

pub struct HttpServer {
    registry: Arc<Mutex<Registry>>,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(registry: Registry, config: HttpConfig) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let result = rouille::router!(request,
            (GET) (/tracks) => {
                self.handle_list_tracks(request)
            },
            (POST) (/tracks) => {
                self.handle_register(request)
            },
            (GET) (/tracks/{id: String}) => {
                self.handle_get_track(&id)
            },
            (GET) (/tracks/{id: String}/history) => {
                self.handle_history(&id)
            },
            (POST) (/tracks/{id: String}/transfer) => {
                self.handle_transfer(&id, request)
            },
            (POST) (/tracks/{id: String}/license) => {
                self.handle_update_license(&id, request)
            },
            (POST) (/call/{function: String}) => {
                self.handle_call(&function, request)
            },
            _ => Ok(Response::empty_404())
        );

        let response = result.unwrap_or_else(ApiError::into_response);
        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>, ApiError> {
        self.registry
            .lock()
            .map_err(|e| ApiError::Internal(format!("Could not access registry under lock: {e}")))
    }

    fn handle_list_tracks(&self, request: &Request) -> Result<Response, ApiError> {
        let owner = request
            .get_param("owner")
            .map(|o| parse_principal(&o))
            .transpose()?;

        let tracks = self.lock()?.list_tracks(owner.as_ref())?;
        Ok(Response::json(
            &tracks
                .iter()
                .map(TrackResponse::from_domain)
                .collect::<Vec<_>>(),
        ))
    }

    fn handle_get_track(&self, id: &str) -> Result<Response, ApiError> {
        let id = parse_track_id(id)?;

        match self.lock()?.get_track_info(id)? {
            Some(track) => Ok(Response::json(&TrackResponse::from_domain(&track))),
            None => Err(ApiError::NotFound(format!("track {id} not found"))),
        }
    }

    fn handle_history(&self, id: &str) -> Result<Response, ApiError> {
        let id = parse_track_id(id)?;

        let events = self.lock()?.history(id)?;
        Ok(Response::json(
            &events
                .iter()
                .map(EventResponse::from_domain)
                .collect::<Vec<_>>(),
        ))
    }

    fn handle_register(&self, request: &Request) -> Result<Response, ApiError> {
        let body: RegisterRequest = rouille::input::json_input(request)?;
        let sender = parse_principal(&body.sender)?;

        let id = self.lock()?.register(
            &sender,
            &body.title,
            &body.artist,
            &body.license_type,
            body.price,
        )?;
        Ok(Response::json(&RegisterResponse { id: id.0 }).with_status_code(201))
    }

    fn handle_transfer(&self, id: &str, request: &Request) -> Result<Response, ApiError> {
        let id = parse_track_id(id)?;
        let body: TransferRequest = rouille::input::json_input(request)?;
        let sender = parse_principal(&body.sender)?;
        let new_owner = parse_principal(&body.new_owner)?;

        self.lock()?.transfer(&sender, id, &new_owner)?;
        Ok(Response::json(&OkResponse { ok: true }))
    }

    fn handle_update_license(&self, id: &str, request: &Request) -> Result<Response, ApiError> {
        let id = parse_track_id(id)?;
        let body: LicenseRequest = rouille::input::json_input(request)?;
        let sender = parse_principal(&body.sender)?;

        self.lock()?
            .update_license(&sender, id, &body.license_type, body.price)?;
        Ok(Response::json(&OkResponse { ok: true }))
    }

    /// Runs a raw contract call and answers with its rendered receipt
    fn handle_call(&self, function: &str, request: &Request) -> Result<Response, ApiError> {
        let body: CallRequest = rouille::input::json_input(request)?;
        let sender = parse_principal(&body.sender)?;
        let call = ContractCall::parse(function, &body.args)?;

        let mut registry = self.lock()?;
        let value = contract::execute(&mut registry, &sender, call)?;
        Ok(Response::json(&CallResponse {
            function: function.to_string(),
            result: value.to_string(),
        }))
    }
}

fn parse_track_id(id: &str) -> Result<TrackId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))
}

fn parse_principal(value: &str) -> Result<Principal, ApiError> {
    value
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))
}

#[derive(Serialize, Deserialize)]
struct TrackResponse {
    id: u64,
    title: String,
    artist: String,
    owner: String,
    license_type: String,
    price: u64,
}

impl TrackResponse {
    fn from_domain(track: &Track) -> Self {
        Self {
            id: track.id.0,
            title: track.title.clone(),
            artist: track.artist.clone(),
            owner: track.owner.to_string(),
            license_type: track.license.license_type.clone(),
            price: track.license.price,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct EventResponse {
    seq: u64,
    kind: String,
    sender: String,
    detail: String,
    recorded_at: i64,
}

impl EventResponse {
    fn from_domain(event: &TrackEvent) -> Self {
        Self {
            seq: event.seq,
            kind: event.kind.to_string(),
            sender: event.sender.to_string(),
            detail: event.detail.clone(),
            recorded_at: event.recorded_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RegisterRequest {
    sender: String,
    title: String,
    artist: String,
    license_type: String,
    price: u64,
}

#[derive(Serialize, Deserialize)]
struct RegisterResponse {
    id: u64,
}

#[derive(Serialize, Deserialize)]
struct TransferRequest {
    sender: String,
    new_owner: String,
}

#[derive(Serialize, Deserialize)]
struct LicenseRequest {
    sender: String,
    license_type: String,
    price: u64,
}

#[derive(Serialize, Deserialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Serialize, Deserialize)]
struct CallRequest {
    sender: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct CallResponse {
    function: String,
    result: String,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
