//! User-Agent rotation.
//!
//! Responsibilities:
//! - Hold the configured pool of user-agent strings.
//! - Pick one uniformly at random for each attempt.
//! - Merge caller-supplied headers on top (caller wins on collisions).

use http::header::{HeaderMap, HeaderValue, USER_AGENT};
use rand::seq::SliceRandom;
use rand::thread_rng;

/// Pool of user-agent strings, validated as header values up front.
#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<HeaderValue>,
}

impl UserAgentPool {
    pub fn new<I, S>(agents: I) -> Result<Self, UserAgentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let agents = agents
            .into_iter()
            .map(|agent| {
                let agent = agent.as_ref();
                HeaderValue::from_str(agent)
                    .map_err(|_| UserAgentError::InvalidAgent(agent.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if agents.is_empty() {
            return Err(UserAgentError::Empty);
        }
        Ok(Self { agents })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn random(&self) -> HeaderValue {
        let mut rng = thread_rng();
        self.agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("Mozilla/5.0"))
    }

    /// Random user agent, overridden by any header the caller supplied.
    pub fn build_headers(&self, caller: Option<&HeaderMap>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.random());
        if let Some(caller) = caller {
            for name in caller.keys() {
                headers.remove(name);
                for value in caller.get_all(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        headers
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserAgentError {
    #[error("user-agent pool is empty")]
    Empty,
    #[error("user-agent is not a valid header value: {0:?}")]
    InvalidAgent(String),
}
