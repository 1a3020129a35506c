//! Resilient request orchestration.
//!
//! Wires the transport, the proxy source and the Tor rotator together behind a
//! single `make_request` call. Each logical request walks an ordered sequence
//! of strategies (proxy first, Tor as fallback, or Tor only), makes a bounded
//! number of attempts per strategy with an escalating backoff, and rotates the
//! Tor identity at most once per strategy pass when the target answers with a
//! block status. Ordinary failure never surfaces as an error: exhausting every
//! strategy yields `Ok(None)`.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, Method};
use thiserror::Error;
use tokio::time::sleep;
use url::Url;

use crate::config::ScraperConfig;
use crate::modules::events::{
	AttemptEvent, EventDispatcher, EventHandler, ExhaustedEvent, IdentityEvent, LoggingHandler,
	NetworkEvent, RotationEvent, StrategyEvent,
};
use crate::modules::proxy::{ProxyProvider, ProxySource};
use crate::modules::tor::{IdentityRotator, TorControlClient, TorRotator};
use crate::network::core::{
	AttemptOutcome, FetchResponse, HttpTransport, NetworkIdentity, OutboundRequest, ProxyRoute,
	ReqwestTransport, RequestAttempt, RetryPolicy, Strategy,
};
use crate::network::user_agents::{UserAgentError, UserAgentPool};

/// Result alias used across the orchestration layer.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Programmer errors; network failures never end up here.
#[derive(Debug, Error)]
pub enum ExecutorError {
	#[error("url parse error: {0}")]
	Url(#[from] url::ParseError),
	#[error("user-agent initialisation failed: {0}")]
	UserAgent(#[from] UserAgentError),
}

/// Static knobs the state machine reads on every attempt.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
	pub tor_only: bool,
	pub tor_route: ProxyRoute,
	pub request_timeout: Duration,
	pub rotation_settle: Duration,
	pub log_identity: bool,
}

impl ExecutorSettings {
	pub fn from_config(config: &ScraperConfig) -> Self {
		Self {
			tor_only: config.network.use_tor,
			tor_route: config.tor.proxy_route(),
			request_timeout: config.network.request_timeout(),
			rotation_settle: config.tor.settle(),
			log_identity: config.network.log_identity,
		}
	}
}

/// Fluent builder for [`ResilientExecutor`].
///
/// Collaborators that are not injected are built from the configuration:
/// a reqwest transport, a [`ProxyProvider`] and a [`TorRotator`] sharing it.
pub struct ResilientExecutorBuilder {
	config: ScraperConfig,
	transport: Option<Arc<dyn HttpTransport>>,
	proxies: Option<Arc<dyn ProxySource>>,
	rotator: Option<Arc<dyn IdentityRotator>>,
	policy: Option<RetryPolicy>,
	handlers: Vec<Arc<dyn EventHandler>>,
}

impl ResilientExecutorBuilder {
	pub fn new(config: ScraperConfig) -> Self {
		Self {
			config,
			transport: None,
			proxies: None,
			rotator: None,
			policy: None,
			handlers: Vec::new(),
		}
	}

	pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn with_proxy_source(mut self, proxies: Arc<dyn ProxySource>) -> Self {
		self.proxies = Some(proxies);
		self
	}

	pub fn with_rotator(mut self, rotator: Arc<dyn IdentityRotator>) -> Self {
		self.rotator = Some(rotator);
		self
	}

	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = Some(policy);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	pub fn build(self) -> ExecutorResult<ResilientExecutor> {
		let config = self.config;
		let transport: Arc<dyn HttpTransport> = self
			.transport
			.unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
		let proxies: Arc<dyn ProxySource> = self
			.proxies
			.unwrap_or_else(|| Arc::new(ProxyProvider::new(&config, transport.clone())));
		let rotator: Arc<dyn IdentityRotator> = match self.rotator {
			Some(rotator) => rotator,
			None => {
				let control = TorControlClient::from_settings(&config.tor, config.network.request_timeout());
				Arc::new(TorRotator::new(&config, transport.clone(), Arc::new(control)))
			}
		};
		let policy = self
			.policy
			.unwrap_or_else(|| RetryPolicy::from(&config.retry));
		let user_agents = UserAgentPool::new(&config.network.user_agents)?;

		let mut events = EventDispatcher::new();
		events.register_handler(Arc::new(LoggingHandler));
		for handler in self.handlers {
			events.register_handler(handler);
		}

		Ok(ResilientExecutor {
			transport,
			proxies,
			rotator,
			policy,
			user_agents,
			settings: ExecutorSettings::from_config(&config),
			events,
		})
	}
}

/// Delivers one logical HTTP request across strategies, retries and rotations.
pub struct ResilientExecutor {
	transport: Arc<dyn HttpTransport>,
	proxies: Arc<dyn ProxySource>,
	rotator: Arc<dyn IdentityRotator>,
	policy: RetryPolicy,
	user_agents: UserAgentPool,
	settings: ExecutorSettings,
	events: EventDispatcher,
}

impl ResilientExecutor {
	/// Obtain a builder seeded with the given configuration.
	pub fn builder(config: ScraperConfig) -> ResilientExecutorBuilder {
		ResilientExecutorBuilder::new(config)
	}

	/// Executor with production collaborators built from the configuration.
	pub fn from_config(config: &ScraperConfig) -> ExecutorResult<Self> {
		ResilientExecutorBuilder::new(config.clone()).build()
	}

	pub fn settings(&self) -> &ExecutorSettings {
		&self.settings
	}

	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Perform an HTTP GET request.
	pub async fn get(&self, url: &str) -> ExecutorResult<Option<FetchResponse>> {
		self.make_request(url, Method::GET, None, None).await
	}

	/// Perform an HTTP POST carrying a JSON body.
	pub async fn post_json(
		&self,
		url: &str,
		payload: &serde_json::Value,
		headers: Option<&HeaderMap>,
	) -> ExecutorResult<Option<FetchResponse>> {
		self.make_request(url, Method::POST, Some(payload), headers).await
	}

	/// Deliver a request through every configured strategy until one answers 200.
	///
	/// Returns `Ok(None)` once all strategies and attempts are exhausted; the
	/// caller is expected to skip the URL for this run.
	pub async fn make_request(
		&self,
		url: &str,
		method: Method,
		json_payload: Option<&serde_json::Value>,
		headers: Option<&HeaderMap>,
	) -> ExecutorResult<Option<FetchResponse>> {
		let url = Url::parse(url)?;
		let body = if method == Method::POST {
			json_payload.cloned()
		} else {
			None
		};
		let mut last_outcome = None;

		for &strategy in Strategy::sequence(self.settings.tor_only) {
			self.events.dispatch(NetworkEvent::StrategyStarted(StrategyEvent {
				url: url.clone(),
				strategy,
				timestamp: chrono::Utc::now(),
			}));

			if let Some(response) = self
				.run_strategy(strategy, &method, &url, body.as_ref(), headers, &mut last_outcome)
				.await
			{
				return Ok(Some(response));
			}

			self.events.dispatch(NetworkEvent::StrategyExhausted(StrategyEvent {
				url: url.clone(),
				strategy,
				timestamp: chrono::Utc::now(),
			}));
		}

		self.events.dispatch(NetworkEvent::Exhausted(ExhaustedEvent {
			url,
			last_outcome,
			timestamp: chrono::Utc::now(),
		}));
		Ok(None)
	}

	async fn run_strategy(
		&self,
		strategy: Strategy,
		method: &Method,
		url: &Url,
		body: Option<&serde_json::Value>,
		headers: Option<&HeaderMap>,
		last_outcome: &mut Option<AttemptOutcome>,
	) -> Option<FetchResponse> {
		let max_attempts = self.policy.max_retries();
		let mut rotation_used = false;
		let mut exit_ip = None;

		for attempt in 1..=max_attempts {
			let identity = self.resolve_identity(strategy);
			if self.settings.log_identity {
				exit_ip = self.describe_identity(&identity, attempt).await;
			}

			let request = OutboundRequest::new(method.clone(), url.clone())
				.with_headers(self.user_agents.build_headers(headers))
				.with_json(body.cloned());

			let result = self
				.transport
				.execute(&request, identity.route.as_ref(), self.settings.request_timeout)
				.await;

			let outcome = match result {
				Ok(ref response) => AttemptOutcome::Response(response.status()),
				Err(ref err) => {
					log::debug!("{} attempt {attempt} for {url} failed: {err}", strategy);
					AttemptOutcome::Failed(err.kind())
				}
			};
			self.events.dispatch(NetworkEvent::Attempt(AttemptEvent {
				attempt: RequestAttempt {
					method: method.clone(),
					url: url.clone(),
					strategy,
					identity: identity.label().to_string(),
					attempt,
					max_attempts,
					outcome: outcome.clone(),
				},
				timestamp: chrono::Utc::now(),
			}));
			*last_outcome = Some(outcome);

			if let Ok(response) = result {
				let status = response.status();
				if RetryPolicy::is_success(status) {
					return Some(response);
				}

				if strategy == Strategy::Tor && self.policy.is_block(status) && !rotation_used {
					rotation_used = true;
					let new_ip = self.rotator.rotate_ip().await;
					self.events.dispatch(NetworkEvent::Rotation(RotationEvent {
						url: url.clone(),
						trigger_status: status,
						previous_ip: exit_ip.take(),
						new_ip,
						timestamp: chrono::Utc::now(),
					}));
					pause(self.settings.rotation_settle).await;
				}
			}

			if attempt < max_attempts {
				pause(self.policy.delay_for(attempt)).await;
			}
		}

		None
	}

	fn resolve_identity(&self, strategy: Strategy) -> NetworkIdentity {
		match strategy {
			Strategy::Proxy => NetworkIdentity::new(strategy, self.proxies.get_proxy()),
			Strategy::Tor => NetworkIdentity::new(strategy, Some(self.settings.tor_route.clone())),
		}
	}

	/// Emits the identity event; returns the Tor exit IP when one was observed.
	async fn describe_identity(&self, identity: &NetworkIdentity, attempt: u32) -> Option<String> {
		let mut exit_ip = None;
		let description = match (identity.strategy, identity.route.as_ref()) {
			(Strategy::Proxy, Some(route)) => {
				let location = self.proxies.get_proxy_location(Some(route)).await;
				format!("Proxy: {} ({}, {})", location.ip, location.city, location.country)
			}
			(Strategy::Proxy, None) => "direct connection".to_string(),
			(Strategy::Tor, _) => {
				let ip = self.rotator.get_current_ip().await;
				let description = format!("TOR: {ip}");
				if !ip.is_empty() {
					exit_ip = Some(ip);
				}
				description
			}
		};
		self.events.dispatch(NetworkEvent::Identity(IdentityEvent {
			strategy: identity.strategy,
			attempt,
			description,
			timestamp: chrono::Utc::now(),
		}));
		exit_ip
	}
}

async fn pause(duration: Duration) {
	if duration > Duration::from_millis(0) {
		sleep(duration).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::modules::proxy::ProxyLocation;
	use crate::network::core::TransportError;
	use async_trait::async_trait;
	use http::header::{CONTENT_TYPE, USER_AGENT};
	use http::HeaderValue;
	use std::sync::Mutex;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[derive(Debug, Clone)]
	struct SentRequest {
		route: Option<ProxyRoute>,
		headers: HeaderMap,
		json: Option<serde_json::Value>,
	}

	/// Replays scripted outcomes; the last entry repeats once the script runs out.
	struct StubTransport {
		script: Mutex<Vec<Result<u16, &'static str>>>,
		sent: Mutex<Vec<SentRequest>>,
	}

	impl StubTransport {
		fn new(script: Vec<Result<u16, &'static str>>) -> Arc<Self> {
			Arc::new(Self {
				script: Mutex::new(script.into_iter().rev().collect()),
				sent: Mutex::new(Vec::new()),
			})
		}

		fn statuses(statuses: &[u16]) -> Arc<Self> {
			Self::new(statuses.iter().map(|s| Ok(*s)).collect())
		}

		fn sent(&self) -> Vec<SentRequest> {
			self.sent.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl HttpTransport for StubTransport {
		async fn execute(
			&self,
			request: &OutboundRequest,
			route: Option<&ProxyRoute>,
			_timeout: Duration,
		) -> Result<FetchResponse, TransportError> {
			self.sent.lock().unwrap().push(SentRequest {
				route: route.cloned(),
				headers: request.headers.clone(),
				json: request.json.clone(),
			});
			let next = {
				let mut script = self.script.lock().unwrap();
				if script.len() > 1 {
					script.pop().unwrap()
				} else {
					*script.last().expect("empty script")
				}
			};
			match next {
				Ok(status) => Ok(FetchResponse::new(
					status,
					HeaderMap::new(),
					format!("status {status}").into_bytes(),
					request.url.clone(),
				)),
				Err(_) => Err(TransportError::Timeout("stub".into())),
			}
		}
	}

	struct StubProxySource {
		route: Option<ProxyRoute>,
		calls: AtomicUsize,
	}

	#[async_trait]
	impl ProxySource for StubProxySource {
		fn get_proxy(&self) -> Option<ProxyRoute> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.route.clone()
		}

		async fn get_proxy_location(&self, _route: Option<&ProxyRoute>) -> ProxyLocation {
			ProxyLocation::unavailable()
		}
	}

	struct StubRotator {
		rotations: AtomicUsize,
	}

	#[async_trait]
	impl IdentityRotator for StubRotator {
		async fn get_current_ip(&self) -> String {
			"10.0.0.1".into()
		}

		async fn rotate_ip(&self) -> String {
			self.rotations.fetch_add(1, Ordering::SeqCst);
			"10.0.0.2".into()
		}
	}

	#[derive(Default)]
	struct RecordingHandler {
		attempts: Mutex<Vec<RequestAttempt>>,
		rotations: AtomicUsize,
		rotation_events: Mutex<Vec<RotationEvent>>,
		exhausted: AtomicUsize,
	}

	impl EventHandler for RecordingHandler {
		fn handle(&self, event: &NetworkEvent) {
			match event {
				NetworkEvent::Attempt(record) => {
					self.attempts.lock().unwrap().push(record.attempt.clone());
				}
				NetworkEvent::Rotation(rotation) => {
					self.rotations.fetch_add(1, Ordering::SeqCst);
					self.rotation_events.lock().unwrap().push(rotation.clone());
				}
				NetworkEvent::Exhausted(_) => {
					self.exhausted.fetch_add(1, Ordering::SeqCst);
				}
				_ => {}
			}
		}
	}

	impl RecordingHandler {
		fn strategies(&self) -> Vec<Strategy> {
			self.attempts.lock().unwrap().iter().map(|a| a.strategy).collect()
		}
	}

	struct Harness {
		executor: ResilientExecutor,
		transport: Arc<StubTransport>,
		proxies: Arc<StubProxySource>,
		rotator: Arc<StubRotator>,
		recorder: Arc<RecordingHandler>,
	}

	fn harness(tor_only: bool, max_retries: u32, block_codes: &[u16], transport: Arc<StubTransport>) -> Harness {
		harness_with_timing(tor_only, max_retries, block_codes, vec![Duration::ZERO], 0.0, transport)
	}

	fn harness_with_timing(
		tor_only: bool,
		max_retries: u32,
		block_codes: &[u16],
		delays: Vec<Duration>,
		settle_secs: f64,
		transport: Arc<StubTransport>,
	) -> Harness {
		let mut config = ScraperConfig::default();
		config.network.use_tor = tor_only;
		config.network.log_identity = true;
		config.network.user_agents = vec!["test-agent".into()];
		config.tor.settle_secs = settle_secs;

		let proxies = Arc::new(StubProxySource {
			route: Some(ProxyRoute::both("http://198.51.100.1:8080")),
			calls: AtomicUsize::new(0),
		});
		let rotator = Arc::new(StubRotator {
			rotations: AtomicUsize::new(0),
		});
		let recorder = Arc::new(RecordingHandler::default());

		let executor = ResilientExecutor::builder(config)
			.with_transport(transport.clone())
			.with_proxy_source(proxies.clone())
			.with_rotator(rotator.clone())
			.with_retry_policy(RetryPolicy::new(max_retries, delays, block_codes.iter().copied()))
			.with_event_handler(recorder.clone())
			.build()
			.unwrap();

		Harness {
			executor,
			transport,
			proxies,
			rotator,
			recorder,
		}
	}

	const URL: &str = "https://www.imdb.com/title/tt0111161/";

	#[tokio::test]
	async fn exhausts_proxy_before_falling_back_to_tor() {
		let h = harness(false, 3, &[429], StubTransport::statuses(&[500]));
		let response = h.executor.get(URL).await.unwrap();

		assert!(response.is_none());
		assert_eq!(
			h.recorder.strategies(),
			vec![
				Strategy::Proxy,
				Strategy::Proxy,
				Strategy::Proxy,
				Strategy::Tor,
				Strategy::Tor,
				Strategy::Tor
			]
		);
		assert_eq!(h.proxies.calls.load(Ordering::SeqCst), 3);
		assert_eq!(h.recorder.exhausted.load(Ordering::SeqCst), 1);

		let routes: Vec<_> = h.transport.sent().into_iter().map(|s| s.route.unwrap()).collect();
		assert_eq!(routes[0].http, "http://198.51.100.1:8080");
		assert_eq!(routes[3].http, "socks5h://127.0.0.1:9050");
	}

	#[tokio::test]
	async fn tor_only_mode_never_uses_proxy() {
		let h = harness(true, 3, &[429], StubTransport::statuses(&[503, 200]));
		let response = h.executor.get(URL).await.unwrap().unwrap();

		assert_eq!(response.status(), 200);
		assert_eq!(h.recorder.strategies(), vec![Strategy::Tor, Strategy::Tor]);
		assert_eq!(h.proxies.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn rotates_once_per_strategy_pass() {
		let h = harness(true, 3, &[429], StubTransport::statuses(&[429, 429, 200]));
		let response = h.executor.get(URL).await.unwrap().unwrap();

		assert_eq!(response.status(), 200);
		assert_eq!(h.rotator.rotations.load(Ordering::SeqCst), 1);
		assert_eq!(h.recorder.rotations.load(Ordering::SeqCst), 1);
		assert_eq!(h.recorder.attempts.lock().unwrap().len(), 3);

		let rotation = h.recorder.rotation_events.lock().unwrap()[0].clone();
		assert_eq!(rotation.previous_ip.as_deref(), Some("10.0.0.1"));
		assert_eq!(rotation.new_ip, "10.0.0.2");
		assert!(rotation.changed());
	}

	#[tokio::test(start_paused = true)]
	async fn backoff_follows_schedule_and_clamps_to_last_delay() {
		let h = harness_with_timing(
			false,
			4,
			&[429],
			vec![Duration::from_secs(1), Duration::from_secs(3)],
			5.0,
			StubTransport::statuses(&[500]),
		);
		let start = tokio::time::Instant::now();
		assert!(h.executor.get(URL).await.unwrap().is_none());

		// 1 + 3 + 3 per strategy, no sleep after the last attempt, no block so no settle
		assert_eq!(start.elapsed(), Duration::from_secs(14));
		assert_eq!(h.recorder.attempts.lock().unwrap().len(), 8);
	}

	#[tokio::test(start_paused = true)]
	async fn rotation_adds_settle_before_backoff() {
		let h = harness_with_timing(
			true,
			4,
			&[429],
			vec![Duration::from_secs(1), Duration::from_secs(3)],
			5.0,
			StubTransport::statuses(&[429]),
		);
		let start = tokio::time::Instant::now();
		assert!(h.executor.get(URL).await.unwrap().is_none());

		// settle 5 once, then 1 + 3 + 3
		assert_eq!(start.elapsed(), Duration::from_secs(12));
		assert_eq!(h.rotator.rotations.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn success_on_first_attempt_never_sleeps() {
		let h = harness_with_timing(
			false,
			4,
			&[429],
			vec![Duration::from_secs(1), Duration::from_secs(3)],
			5.0,
			StubTransport::statuses(&[200]),
		);
		let start = tokio::time::Instant::now();
		assert!(h.executor.get(URL).await.unwrap().is_some());
		assert_eq!(start.elapsed(), Duration::ZERO);
	}

	#[tokio::test]
	async fn always_blocked_exhausts_each_strategy_budget() {
		let h = harness(true, 3, &[429], StubTransport::statuses(&[429]));
		assert!(h.executor.get(URL).await.unwrap().is_none());
		assert_eq!(h.recorder.attempts.lock().unwrap().len(), 3);
		assert_eq!(h.rotator.rotations.load(Ordering::SeqCst), 1);

		let h = harness(false, 3, &[429], StubTransport::statuses(&[429]));
		assert!(h.executor.get(URL).await.unwrap().is_none());
		assert_eq!(h.recorder.strategies().len(), 6);
		assert_eq!(h.rotator.rotations.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn blocked_proxy_is_retried_without_rotation() {
		let h = harness(false, 3, &[403], StubTransport::statuses(&[403, 403, 200]));
		let response = h.executor.get(URL).await.unwrap().unwrap();

		assert_eq!(response.status(), 200);
		assert_eq!(h.rotator.rotations.load(Ordering::SeqCst), 0);
		assert_eq!(h.recorder.strategies(), vec![Strategy::Proxy; 3]);
	}

	#[tokio::test]
	async fn accepted_is_not_success() {
		let h = harness(true, 2, &[202], StubTransport::statuses(&[202, 200]));
		let response = h.executor.get(URL).await.unwrap().unwrap();

		assert_eq!(response.status(), 200);
		assert_eq!(h.rotator.rotations.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn transport_errors_are_retried() {
		let h = harness(false, 3, &[429], StubTransport::new(vec![Err("timeout"), Err("timeout"), Ok(200)]));
		let response = h.executor.get(URL).await.unwrap().unwrap();

		assert_eq!(response.status(), 200);
		let attempts = h.recorder.attempts.lock().unwrap().clone();
		assert_eq!(attempts[0].outcome, AttemptOutcome::Failed("timeout"));
		assert_eq!(attempts[2].outcome, AttemptOutcome::Response(200));
	}

	#[tokio::test]
	async fn post_carries_json_and_caller_headers_win() {
		let h = harness(false, 1, &[429], StubTransport::statuses(&[200]));
		let mut headers = HeaderMap::new();
		headers.insert(USER_AGENT, HeaderValue::from_static("caller-agent"));
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		let payload = serde_json::json!({ "operationName": "Top250MoviesPagination" });

		let response = h.executor.post_json(URL, &payload, Some(&headers)).await.unwrap();
		assert!(response.is_some());

		let sent = h.transport.sent();
		assert_eq!(sent[0].json.as_ref(), Some(&payload));
		assert_eq!(sent[0].headers.get(USER_AGENT).unwrap(), "caller-agent");
		assert_eq!(sent[0].headers.get(CONTENT_TYPE).unwrap(), "application/json");
	}

	#[tokio::test]
	async fn get_uses_pool_agent_and_no_body() {
		let h = harness(false, 1, &[429], StubTransport::statuses(&[200]));
		let payload = serde_json::json!({ "ignored": true });
		h.executor
			.make_request(URL, Method::GET, Some(&payload), None)
			.await
			.unwrap();

		let sent = h.transport.sent();
		assert!(sent[0].json.is_none());
		assert_eq!(sent[0].headers.get(USER_AGENT).unwrap(), "test-agent");
	}

	#[tokio::test]
	async fn invalid_url_is_a_programmer_error() {
		let h = harness(false, 1, &[429], StubTransport::statuses(&[200]));
		assert!(matches!(h.executor.get("not a url").await, Err(ExecutorError::Url(_))));
		assert!(h.transport.sent().is_empty());
	}
}
