use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use super::RouterOsError;
use super::connection::{Sentence, read_sentence, write_sentence};

/// A RouterOS API sentence under construction.
#[derive(Debug, Clone)]
pub struct Command {
    words: Vec<String>,
}

impl Command {
    pub fn new(path: &str) -> Self {
        Command {
            words: vec![path.to_string()],
        }
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.words.push(format!("={key}={value}"));
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.words.push(format!("?{key}={value}"));
        self
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}

pub struct MikroTikClient {
    stream: TcpStream,
    timeout: Duration,
}

impl MikroTikClient {
    /// Connects and logs in with the post-6.43 plain-text `/login`.
    pub async fn connect(
        address: &str,
        username: &str,
        password: &str,
        io_timeout: Duration,
    ) -> Result<Self, RouterOsError> {
        let stream = timeout(io_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| RouterOsError::Timeout(io_timeout))??;
        let mut client = MikroTikClient {
            stream,
            timeout: io_timeout,
        };

        client
            .execute(
                &Command::new("/login")
                    .attr("name", username)
                    .attr("password", password),
            )
            .await
            .map_err(|e| match e {
                RouterOsError::Trap(message) => RouterOsError::Login(message),
                other => other,
            })?;
        log::debug!("Logged in to RouterOS at {} as {}", address, username);
        Ok(client)
    }

    /// Sends one command and collects its `!re` sentences up to `!done`.
    pub async fn execute(&mut self, command: &Command) -> Result<Vec<Sentence>, RouterOsError> {
        let io_timeout = self.timeout;
        timeout(io_timeout, self.round_trip(command))
            .await
            .map_err(|_| RouterOsError::Timeout(io_timeout))?
    }

    async fn round_trip(&mut self, command: &Command) -> Result<Vec<Sentence>, RouterOsError> {
        write_sentence(&mut self.stream, command.words()).await?;

        let mut rows = Vec::new();
        let mut trap: Option<String> = None;
        loop {
            let sentence = Sentence::parse(read_sentence(&mut self.stream).await?)?;
            match sentence.kind.as_str() {
                "!re" => rows.push(sentence),
                "!trap" => {
                    trap.get_or_insert_with(|| {
                        sentence.get("message").unwrap_or("unknown error").to_string()
                    });
                }
                "!fatal" => {
                    return Err(RouterOsError::Fatal(
                        sentence
                            .get("message")
                            .unwrap_or("connection closed by router")
                            .to_string(),
                    ));
                }
                "!done" => {
                    if let Some(message) = trap {
                        return Err(RouterOsError::Trap(message));
                    }
                    // `!done` may carry a result such as `=ret=*1`
                    if !sentence.attributes.is_empty() {
                        rows.push(sentence);
                    }
                    return Ok(rows);
                }
                other => {
                    return Err(RouterOsError::Protocol(format!(
                        "unexpected reply `{other}`"
                    )));
                }
            }
        }
    }
}
