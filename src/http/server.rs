use chrono::{Local, NaiveDate};
use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    config::HttpConfig,
    domain::{
        query::{QueryError, TrackQuery},
        track::Track,
        vote::{VoteRecord, VoterId},
    },
    engine::{
        VoteOutcome,
        error::VoteError,
        promotion::{PromotionFailure, PromotionReport},
    },
    http::error::ApiError,
    session::Session,
};

pub struct HttpServer {
    session: Arc<Mutex<Session>>,
    pub config: HttpConfig,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl HttpServer {
    pub fn new(session: Session, config: HttpConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            config,
            today: local_today,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let result = rouille::router!(request,
            (GET) (/votes) => {
                self.handle_list_votes()
            },
            (POST) (/votes) => {
                self.handle_vote(request)
            },
            (POST) (/promote) => {
                self.handle_promote()
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

    /// requests are served one at a time per process
    fn lock_session(&self) -> Result<MutexGuard<'_, Session>, ApiError> {
        self.session
            .lock()
            .map_err(|e| ApiError::Internal(format!("session lock poisoned: {e}")))
    }

    fn handle_list_votes(&self) -> Result<Response, ApiError> {
        let records = self.lock_session()?.pending((self.today)())?;
        Ok(Response::json(
            &records.iter().map(RecordResponse::from_domain).collect::<Vec<_>>(),
        ))
    }

    fn handle_vote(&self, request: &Request) -> Result<Response, ApiError> {
        let body: VoteRequest = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid vote request: {e}")))?;

        let voter = VoterId::new(&body.user)
            .ok_or(VoteError::InvalidQuery(QueryError::EmptyVoter))?;
        let query = TrackQuery::from_parts(
            body.url.as_deref(),
            body.name.as_deref(),
            body.artist.as_deref(),
        )
        .map_err(VoteError::from)?;

        let receipt = self.lock_session()?.vote(&query, &voter, (self.today)())?;

        let outcome = receipt.nomination.outcome;
        let status = match outcome {
            VoteOutcome::Created => 201,
            VoteOutcome::VoteAdded | VoteOutcome::AlreadyVoted => 200,
        };
        let response = VoteResponse {
            outcome,
            message: outcome.message(),
            track: receipt.nomination.track,
            promotions: receipt.promotions.as_ref().map(PromotionResponse::from_domain),
            promotion_error: receipt.promotion_error.as_ref().map(|e| e.to_string()),
        };
        Ok(Response::json(&response).with_status_code(status))
    }

    fn handle_promote(&self) -> Result<Response, ApiError> {
        let report = self.lock_session()?.promote()?;
        Ok(Response::json(&PromotionResponse::from_domain(&report)))
    }
}

#[derive(Serialize, Deserialize)]
struct VoteRequest {
    user: String,
    url: Option<String>,
    name: Option<String>,
    artist: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RecordResponse {
    url: String,
    name: String,
    artist: String,
    votes: usize,
    added_at: NaiveDate,
    voted_by: Vec<String>,
}

impl RecordResponse {
    fn from_domain(record: &VoteRecord) -> Self {
        Self {
            url: record.url().to_string(),
            name: record.name().to_string(),
            artist: record.artist().to_string(),
            votes: record.votes(),
            added_at: record.added_at(),
            voted_by: record.voted_by().iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FailureResponse {
    url: String,
    reason: String,
}

#[derive(Serialize, Deserialize)]
struct PromotionResponse {
    promoted: Vec<RecordResponse>,
    failed: Vec<FailureResponse>,
}

impl PromotionResponse {
    fn from_domain(report: &PromotionReport) -> Self {
        Self {
            promoted: report
                .promoted
                .iter()
                .map(RecordResponse::from_domain)
                .collect(),
            failed: report
                .failed
                .iter()
                .map(|PromotionFailure { record, error }| FailureResponse {
                    url: record.url().to_string(),
                    reason: error.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct VoteResponse {
    outcome: VoteOutcome,
    message: &'static str,
    track: Track,
    promotions: Option<PromotionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    promotion_error: Option<String>,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::fake::{FakeCatalog, track},
        session::tests::{rules, session},
    };

    use rouille::Request;
    use serde_json::json;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn create_server(catalog: FakeCatalog, threshold: usize) -> HttpServer {
        HttpServer {
            session: Arc::new(Mutex::new(session(catalog, rules(threshold)).unwrap())),
            config: HttpConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8080,
            },
            today: fixed_today,
        }
    }

    fn default_server() -> HttpServer {
        create_server(
            FakeCatalog::with_tracks(vec![
                track("u1", "Hey Jude", "The Beatles"),
                track("u2", "Africa", "Toto"),
            ]),
            5,
        )
    }

    fn post_json(url: &str, body: serde_json::Value) -> Request {
        Request::fake_http(
            "POST",
            url,
            vec![("Content-Type".to_string(), "application/json".to_string())],
            body.to_string().into_bytes(),
        )
    }

    fn get(url: &str) -> Request {
        Request::fake_http("GET", url, vec![], vec![])
    }

    #[test]
    fn test_http_vote_created() -> anyhow::Result<()> {
        let server = default_server();

        let response =
            server.handle_request(&post_json("/votes", json!({"user": "alice", "url": "u1"})));
        assert_eq!(response.status_code, 201);

        let body: serde_json::Value = parse_json_response(response)?;
        assert_eq!(body["outcome"], "created");
        assert_eq!(body["track"]["name"], "Hey Jude");
        assert_eq!(body["promotions"]["promoted"], json!([]));

        Ok(())
    }

    #[test]
    fn test_http_vote_by_search_then_repeat() -> anyhow::Result<()> {
        let server = default_server();
        let request = json!({"user": "alice", "name": "Africa", "artist": "Toto"});

        let first = server.handle_request(&post_json("/votes", request.clone()));
        assert_eq!(first.status_code, 201);

        let again = server.handle_request(&post_json("/votes", request));
        assert_eq!(again.status_code, 200);
        let body: serde_json::Value = parse_json_response(again)?;
        assert_eq!(body["outcome"], "already_voted");

        Ok(())
    }

    #[test]
    fn test_http_vote_invalid_query() {
        let server = default_server();

        let both = server.handle_request(&post_json(
            "/votes",
            json!({"user": "alice", "url": "u1", "name": "Africa", "artist": "Toto"}),
        ));
        assert_eq!(both.status_code, 400);

        let neither = server.handle_request(&post_json("/votes", json!({"user": "alice"})));
        assert_eq!(neither.status_code, 400);

        let no_user = server.handle_request(&post_json("/votes", json!({"user": " ", "url": "u1"})));
        assert_eq!(no_user.status_code, 400);

        let not_json = server.handle_request(&Request::fake_http(
            "POST",
            "/votes",
            vec![],
            b"user=alice".to_vec(),
        ));
        assert_eq!(not_json.status_code, 400);
    }

    #[test]
    fn test_http_vote_not_found() {
        let server = default_server();

        let response =
            server.handle_request(&post_json("/votes", json!({"user": "alice", "url": "nope"})));
        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn test_http_vote_already_in_playlist() -> anyhow::Result<()> {
        let catalog = FakeCatalog::with_tracks(vec![track("u1", "Hey Jude", "The Beatles")]);
        catalog.playlist.lock().unwrap().push("u1".into());
        let server = create_server(catalog, 5);

        let response =
            server.handle_request(&post_json("/votes", json!({"user": "alice", "url": "u1"})));
        assert_eq!(response.status_code, 409);

        let body: serde_json::Value = parse_json_response(response)?;
        assert_eq!(body["error"], "Track already in playlist.");
        Ok(())
    }

    #[test]
    fn test_http_catalog_unavailable() {
        let catalog = FakeCatalog {
            unavailable: true,
            ..FakeCatalog::with_tracks(vec![track("u1", "Hey Jude", "The Beatles")])
        };
        let server = create_server(catalog, 5);

        let response =
            server.handle_request(&post_json("/votes", json!({"user": "alice", "url": "u1"})));
        assert_eq!(response.status_code, 503);
    }

    #[test]
    fn test_http_list_votes_sorted() -> anyhow::Result<()> {
        let server = default_server();

        server.handle_request(&post_json("/votes", json!({"user": "alice", "url": "u1"})));
        server.handle_request(&post_json("/votes", json!({"user": "alice", "url": "u2"})));
        server.handle_request(&post_json("/votes", json!({"user": "bob", "url": "u2"})));

        let response = server.handle_request(&get("/votes"));
        assert_eq!(response.status_code, 200);

        let body: Vec<RecordResponse> = parse_json_response(response)?;
        assert_eq!(
            body.iter().map(|r| r.url.as_str()).collect::<Vec<_>>(),
            vec!["u2", "u1"]
        );
        assert_eq!(body[0].votes, 2);
        assert_eq!(body[0].voted_by, vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(body[0].added_at, fixed_today());
        Ok(())
    }

    #[test]
    fn test_http_vote_triggers_promotion() -> anyhow::Result<()> {
        let server = create_server(
            FakeCatalog::with_tracks(vec![track("u1", "Hey Jude", "The Beatles")]),
            1,
        );

        server.handle_request(&post_json("/votes", json!({"user": "alice", "url": "u1"})));
        let response =
            server.handle_request(&post_json("/votes", json!({"user": "bob", "url": "u1"})));
        assert_eq!(response.status_code, 200);

        let body: serde_json::Value = parse_json_response(response)?;
        assert_eq!(body["outcome"], "vote_added");
        assert_eq!(body["promotions"]["promoted"][0]["url"], "u1");

        let list: Vec<RecordResponse> = parse_json_response(server.handle_request(&get("/votes")))?;
        assert!(list.is_empty());
        Ok(())
    }

    #[test]
    fn test_http_promote_reports_failures() -> anyhow::Result<()> {
        let catalog = FakeCatalog {
            rejected: ["u1".to_string()].into(),
            ..FakeCatalog::with_tracks(vec![track("u1", "Hey Jude", "The Beatles")])
        };
        let server = create_server(catalog, 0);

        // auto promotion already fails once while voting
        let vote = server.handle_request(&post_json("/votes", json!({"user": "alice", "url": "u1"})));
        let body: serde_json::Value = parse_json_response(vote)?;
        assert_eq!(body["promotions"]["failed"][0]["url"], "u1");

        let response = server.handle_request(&post_json("/promote", json!({})));
        assert_eq!(response.status_code, 200);
        let body: PromotionResponse = parse_json_response(response)?;
        assert!(body.promoted.is_empty());
        assert_eq!(body.failed.len(), 1);
        assert!(body.failed[0].reason.contains("404"));

        let list: Vec<RecordResponse> = parse_json_response(server.handle_request(&get("/votes")))?;
        assert_eq!(list.len(), 1);
        Ok(())
    }

    #[test]
    fn test_http_unknown_route() {
        let server = default_server();
        let response = server.handle_request(&get("/tracks"));
        assert_eq!(response.status_code, 404);
    }
}
