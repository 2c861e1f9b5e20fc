use std::time::Duration;

/// The configuration of the client core
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound for a single backend request, in seconds
    pub request_timeout_in_seconds: u64,
    /// The semester shown before the user picks one, 1 to 6
    pub default_semester: u8,
    /// Minimum accepted password length at sign-up
    pub min_password_length: usize,
    /// The shared enrollment code a teacher must supply at sign-up.
    /// Advisory only, the backend re-validates role assignment.
    pub teacher_enrollment_code: String,
}

impl Config {
    /// The request bound as a [Duration]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_in_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Slow mobile networks need a generous bound
            request_timeout_in_seconds: 30,
            // The most recent semester
            default_semester: 6,
            // Matches what the identity provider enforces
            min_password_length: 6,
            teacher_enrollment_code: "NIELITTEACHER".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_timeout() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
