//! # Fragment handles and their textual encodings.
//!
//! A [`Fragment`] is a value snapshot identifying one slot of an
//! [`EquipartitionTask`](crate::EquipartitionTask): the owning task id, the
//! job key, the ordinal and the state observed when the handle was made.
//! Handles travel to remote workers and come back for
//! [`update_fragment`](crate::EquipartitionTask::update_fragment), so they
//! encode losslessly as JSON and as a URL query.
//!
//! ## Wire formats
//! ```text
//! JSON:  {"task":"6f1c…","job":"job-1","index":3,"state":"working"}
//! Query: task=6f1c…&job=job-1&index=3&state=working
//! ```
//!
//! ## State machine
//! ```text
//! Waiting ──pick──► Working ──► Success (done)
//!                      │
//!                      └──► Failure ──pick──► Retrying ──► Success (done)
//!                              ▲                  │──────► Fatal   (done)
//!                              └──────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::FragmentError;

/// Lifecycle state of a fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentState {
    /// Never picked.
    Waiting,
    /// Picked from `Waiting`, outcome pending.
    Working,
    /// Completed (terminal).
    Success,
    /// Failed; eligible for another pick.
    Failure,
    /// Picked from `Failure`, outcome pending.
    Retrying,
    /// Failed permanently (terminal).
    Fatal,
}

impl FragmentState {
    /// Claimed by a worker and awaiting an outcome.
    pub fn is_processing(self) -> bool {
        matches!(self, FragmentState::Working | FragmentState::Retrying)
    }

    /// Terminal: never picked again.
    pub fn is_done(self) -> bool {
        matches!(self, FragmentState::Success | FragmentState::Fatal)
    }

    /// Eligible for `pick`.
    pub fn is_pickable(self) -> bool {
        matches!(self, FragmentState::Waiting | FragmentState::Failure)
    }

    /// Whether a reported outcome may move a fragment from `self` to `next`.
    pub fn can_report(self, next: FragmentState) -> bool {
        matches!(
            (self, next),
            (
                FragmentState::Working,
                FragmentState::Success | FragmentState::Failure
            ) | (
                FragmentState::Retrying,
                FragmentState::Success | FragmentState::Failure | FragmentState::Fatal
            )
        )
    }

    /// Stable lowercase name used by both wire formats.
    pub fn as_str(self) -> &'static str {
        match self {
            FragmentState::Waiting => "waiting",
            FragmentState::Working => "working",
            FragmentState::Success => "success",
            FragmentState::Failure => "failure",
            FragmentState::Retrying => "retrying",
            FragmentState::Fatal => "fatal",
        }
    }
}

impl fmt::Display for FragmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FragmentState {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Ok(FragmentState::Waiting),
            "working" => Ok(FragmentState::Working),
            "success" => Ok(FragmentState::Success),
            "failure" => Ok(FragmentState::Failure),
            "retrying" => Ok(FragmentState::Retrying),
            "fatal" => Ok(FragmentState::Fatal),
            _ => Err(FragmentError::UnknownState(s.to_string())),
        }
    }
}

/// Value handle for one fragment of an equipartition task.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fragment {
    task: Uuid,
    job: String,
    index: u32,
    state: FragmentState,
}

impl Fragment {
    pub(crate) fn new(task: Uuid, job: impl Into<String>, index: u32, state: FragmentState) -> Self {
        Self {
            task,
            job: job.into(),
            index,
            state,
        }
    }

    /// Id of the owning task.
    pub fn task_id(&self) -> Uuid {
        self.task
    }

    /// Job key of the owning task.
    pub fn job_id(&self) -> &str {
        &self.job
    }

    /// Ordinal within the task.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// State observed when this handle was produced.
    pub fn state(&self) -> FragmentState {
        self.state
    }

    /// Decodes a handle from either the JSON or the query form.
    ///
    /// Text whose first non-blank character is `{` is read as JSON; anything
    /// else as a query string (a leading `?` is tolerated).
    ///
    /// # Example
    /// ```
    /// use fragvisor::{EquipartitionTask, Fragment};
    ///
    /// let task = EquipartitionTask::new("owner", "job", 2, "demo");
    /// let f = task.pick().unwrap();
    ///
    /// assert_eq!(Fragment::parse(&f.to_json_string()).unwrap(), f);
    /// assert_eq!(Fragment::parse(&f.to_string()).unwrap(), f);
    /// ```
    pub fn parse(s: &str) -> Result<Self, FragmentError> {
        let s = s.trim();
        if s.starts_with('{') {
            return Ok(serde_json::from_str(s)?);
        }
        Self::from_query(s.strip_prefix('?').unwrap_or(s))
    }

    /// JSON form: `{"task":…,"job":…,"index":…,"state":…}`.
    pub fn to_json_string(&self) -> String {
        serde_json::json!({
            "task": self.task,
            "job": self.job,
            "index": self.index,
            "state": self.state,
        })
        .to_string()
    }

    /// Query form as ordered key/value pairs.
    pub fn to_query_data(&self) -> QueryData {
        QueryData {
            pairs: vec![
                ("task", self.task.to_string()),
                ("job", self.job.clone()),
                ("index", self.index.to_string()),
                ("state", self.state.as_str().to_string()),
            ],
        }
    }

    fn from_query(s: &str) -> Result<Self, FragmentError> {
        let mut task = None;
        let mut job = None;
        let mut index = None;
        let mut state = None;

        for (key, value) in form_urlencoded::parse(s.as_bytes()) {
            match key.as_ref() {
                "task" => {
                    let id = Uuid::parse_str(&value).map_err(|_| FragmentError::InvalidValue {
                        field: "task",
                        value: value.to_string(),
                    })?;
                    task = Some(id);
                }
                "job" => job = Some(value.into_owned()),
                "index" => {
                    let n = value.parse::<u32>().map_err(|_| FragmentError::InvalidValue {
                        field: "index",
                        value: value.to_string(),
                    })?;
                    index = Some(n);
                }
                "state" => state = Some(value.parse::<FragmentState>()?),
                _ => {}
            }
        }

        Ok(Self {
            task: task.ok_or(FragmentError::MissingField("task"))?,
            job: job.ok_or(FragmentError::MissingField("job"))?,
            index: index.ok_or(FragmentError::MissingField("index"))?,
            state: state.ok_or(FragmentError::MissingField("state"))?,
        })
    }
}

impl fmt::Display for Fragment {
    /// Renders the query form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_query_data(), f)
    }
}

impl FromStr for Fragment {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fragment::parse(s)
    }
}

/// Ordered query pairs; `Display` yields `application/x-www-form-urlencoded` text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryData {
    pairs: Vec<(&'static str, String)>,
}

impl QueryData {
    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Pairs in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl fmt::Display for QueryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish();
        f.write_str(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Fragment {
        Fragment::new(Uuid::new_v4(), "job a&b=c", 7, FragmentState::Retrying)
    }

    #[test]
    fn test_state_transitions() {
        use FragmentState::*;

        assert!(Working.can_report(Success));
        assert!(Working.can_report(Failure));
        assert!(!Working.can_report(Fatal));
        assert!(Retrying.can_report(Fatal));
        assert!(!Waiting.can_report(Success));
        assert!(!Failure.can_report(Success));
        assert!(!Success.can_report(Failure));
        assert!(!Working.can_report(Working));
    }

    #[test]
    fn test_state_names() {
        for state in [
            FragmentState::Waiting,
            FragmentState::Working,
            FragmentState::Success,
            FragmentState::Failure,
            FragmentState::Retrying,
            FragmentState::Fatal,
        ] {
            assert_eq!(state.as_str().parse::<FragmentState>().unwrap(), state);
        }
        assert!(matches!(
            "paused".parse::<FragmentState>(),
            Err(FragmentError::UnknownState(_))
        ));
    }

    #[test]
    fn test_json_shape() {
        let f = sample();
        let v: serde_json::Value = serde_json::from_str(&f.to_json_string()).unwrap();
        assert_eq!(v["job"], "job a&b=c");
        assert_eq!(v["index"], 7);
        assert_eq!(v["state"], "retrying");
        assert_eq!(v["task"], f.task_id().to_string());
    }

    #[test]
    fn test_query_escapes_reserved_characters() {
        let f = sample();
        let q = f.to_query_data();
        assert_eq!(q.get("job"), Some("job a&b=c"));
        assert!(q.to_string().contains("job=job+a%26b%3Dc"));
        assert_eq!(Fragment::parse(&format!("?{q}")).unwrap(), f);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Fragment::parse("job=x&index=1&state=working"),
            Err(FragmentError::MissingField("task"))
        ));

        let id = Uuid::new_v4();
        assert!(matches!(
            Fragment::parse(&format!("task={id}&job=x&index=-1&state=working")),
            Err(FragmentError::InvalidValue { field: "index", .. })
        ));
        assert!(matches!(
            Fragment::parse("task=nope&job=x&index=1&state=working"),
            Err(FragmentError::InvalidValue { field: "task", .. })
        ));
        assert!(matches!(
            Fragment::parse("{\"task\": 1}"),
            Err(FragmentError::Json(_))
        ));
    }
}
