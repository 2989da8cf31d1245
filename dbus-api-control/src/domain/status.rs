use serde::Serialize;

/// Snapshot of the supervised service as reported by `svstat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub pid: Option<u32>,
    /// Only known while the service is up.
    pub uptime_seconds: Option<u64>,
    pub raw: String,
    /// Set when `svstat` itself failed; `raw` then holds its stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceStatus {
    /// Parses one `svstat` line, e.g. `/service/x: up (pid 1234) 567 seconds`
    /// or `/service/x: down 12 seconds, normally up`. Missing fields stay
    /// `None`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let rest = raw.split_once(": ").map_or(raw, |(_, rest)| rest);
        let running = rest.split_whitespace().next() == Some("up");

        let pid = rest
            .split_once("(pid ")
            .and_then(|(_, tail)| tail.split_once(')'))
            .and_then(|(pid, _)| pid.trim().parse().ok());

        let uptime_seconds = if running {
            let words: Vec<&str> = rest.split_whitespace().collect();
            words
                .iter()
                .position(|word| word.starts_with("seconds"))
                .filter(|&idx| idx > 0)
                .and_then(|idx| words[idx - 1].parse().ok())
        } else {
            None
        };

        Self {
            running,
            pid,
            uptime_seconds,
            raw: raw.to_string(),
            error: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            running: false,
            pid: None,
            uptime_seconds: None,
            raw: message.clone(),
            error: Some(message),
        }
    }
}
