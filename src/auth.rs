use reqwest::RequestBuilder;

/// Credential attached to GitLab API requests.
///
/// Personal/project access tokens travel in `PRIVATE-TOKEN`, the ephemeral
/// job token provided by the runner travels in `JOB-TOKEN`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Private(String),
    Job(String),
}

impl Token {
    /// Picks the access token when both are available.
    pub fn from_env_values(private: Option<String>, job: Option<String>) -> Option<Self> {
        private
            .filter(|t| !t.is_empty())
            .map(Token::Private)
            .or_else(|| job.filter(|t| !t.is_empty()).map(Token::Job))
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Token::Private(t) => request.header("PRIVATE-TOKEN", t),
            Token::Job(t) => request.header("JOB-TOKEN", t),
        }
    }
}
