//! Deepgram live transcription over WebSocket.

use crate::config::DeepgramConfig;
use crate::error::VoiceError;
use crate::recognition::{
    RecognitionConnection, RecognitionEvent, RecognitionOptions, RecognitionStream, Recognizer,
    RECOGNITION_EVENT_CAPACITY,
};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::Instrument;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Message that asks Deepgram to flush pending results and close.
const CLOSE_STREAM: &str = r#"{"type":"CloseStream"}"#;

#[derive(Debug, Clone)]
pub struct DeepgramRecognizer {
    config: DeepgramConfig,
}

impl DeepgramRecognizer {
    pub fn new(config: DeepgramConfig) -> Result<Self, VoiceError> {
        if config.api_key.is_empty() {
            return Err(VoiceError::Config("deepgram api_key is not set".to_string()));
        }
        Ok(Self { config })
    }

    /// Builds the listen URL with the recognition options as query parameters.
    pub fn listen_url(&self, options: &RecognitionOptions) -> Result<String, VoiceError> {
        let mut url = reqwest::Url::parse(&self.config.url)
            .map_err(|e| VoiceError::Config(format!("invalid deepgram url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("model", &options.model)
            .append_pair("language", &options.language)
            .append_pair("smart_format", &options.smart_format.to_string())
            .append_pair("encoding", &options.encoding)
            .append_pair("channels", &options.channels.to_string())
            .append_pair("sample_rate", &options.sample_rate.to_string())
            .append_pair("interim_results", &options.interim_results.to_string());
        Ok(url.into())
    }
}

#[async_trait]
impl Recognizer for DeepgramRecognizer {
    async fn open(&self, options: &RecognitionOptions) -> Result<RecognitionStream, VoiceError> {
        let url = self.listen_url(options)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| VoiceError::InvalidInput(format!("invalid listen request: {}", e)))?;
        let token = HeaderValue::from_str(&format!("Token {}", self.config.api_key))
            .map_err(|_| VoiceError::Config("deepgram api_key is not a valid header".to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, token);

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| VoiceError::Recognition(format!("connect failed: {}", e)))?;
        tracing::debug!(model = %options.model, "deepgram connection open");

        let (sink, stream) = socket.split();
        let (tx, events) = mpsc::channel(RECOGNITION_EVENT_CAPACITY);
        tokio::spawn(read_events(stream, tx).in_current_span());

        Ok(RecognitionStream {
            connection: Box::new(DeepgramConnection {
                sink,
                closed: false,
            }),
            events,
        })
    }
}

struct DeepgramConnection {
    sink: SplitSink<Socket, Message>,
    closed: bool,
}

#[async_trait]
impl RecognitionConnection for DeepgramConnection {
    async fn send(&mut self, audio: &[u8]) -> Result<(), VoiceError> {
        if self.closed {
            return Err(VoiceError::Recognition("connection already closed".to_string()));
        }
        self.sink
            .send(Message::Binary(audio.to_vec().into()))
            .await
            .map_err(|e| VoiceError::Recognition(format!("send failed: {}", e)))
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink
            .send(Message::Text(CLOSE_STREAM.into()))
            .await
            .map_err(|e| VoiceError::Recognition(format!("close failed: {}", e)))
    }
}

/// Forwards parsed results until the server closes or the receiver goes away.
async fn read_events(mut stream: SplitStream<Socket>, tx: mpsc::Sender<RecognitionEvent>) {
    while let Some(message) = stream.next().await {
        let event = match message {
            Ok(Message::Text(text)) => match parse_message(&text) {
                Some(event) => event,
                None => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => RecognitionEvent::Error(format!("connection lost: {}", e)),
        };
        let terminal = matches!(event, RecognitionEvent::Error(_));
        if tx.send(event).await.is_err() || terminal {
            break;
        }
    }
    tracing::debug!("deepgram event reader finished");
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ListenMessage {
    Results {
        channel: ResultChannel,
        #[serde(default)]
        is_final: bool,
    },
    Error {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ResultChannel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

/// Maps one server message to an event. Metadata, empty results and
/// unparseable frames produce nothing.
pub(crate) fn parse_message(text: &str) -> Option<RecognitionEvent> {
    let message: ListenMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unrecognized deepgram message");
            return None;
        }
    };
    match message {
        ListenMessage::Results { channel, is_final } => {
            let text = channel.alternatives.into_iter().next()?.transcript;
            if text.trim().is_empty() {
                return None;
            }
            Some(RecognitionEvent::Transcript { text, is_final })
        }
        ListenMessage::Error {
            description,
            message,
        } => Some(RecognitionEvent::Error(
            description
                .or(message)
                .unwrap_or_else(|| "unspecified error".to_string()),
        )),
        ListenMessage::Other => None,
    }
}
