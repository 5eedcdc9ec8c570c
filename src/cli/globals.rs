use secrecy::SecretString;

/// Credentials handed over by the hosting environment.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub client_id: String,
    pub client_secret: SecretString,
    pub session_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(client_id: String) -> Self {
        Self {
            client_id,
            client_secret: SecretString::default(),
            session_secret: SecretString::default(),
        }
    }

    pub fn set_client_secret(&mut self, secret: SecretString) {
        self.client_secret = secret;
    }

    pub fn set_session_secret(&mut self, secret: SecretString) {
        self.session_secret = secret;
    }
}
